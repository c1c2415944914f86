//! C5: the set of transaction ids currently in flight.

use std::collections::HashSet;
use std::sync::RwLock;

use crate::txn::txid::TxId;

/// An immutable snapshot of [`ActiveSet`] taken for the duration of one
/// operation, so visibility decisions stay consistent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveSetSnapshot(HashSet<TxId>);

impl ActiveSetSnapshot {
    pub fn empty() -> Self {
        Self(HashSet::new())
    }

    pub fn contains(&self, tx: TxId) -> bool {
        self.0.contains(&tx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TxId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<TxId> for ActiveSetSnapshot {
    fn from_iter<I: IntoIterator<Item = TxId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The process-wide set of in-flight transactions, guarded by its own lock
/// per the lock-order discipline: the tree lock comes first, this comes last.
pub struct ActiveSet {
    inner: RwLock<HashSet<TxId>>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self { inner: RwLock::new(HashSet::new()) }
    }

    pub fn insert(&self, tx: TxId) {
        self.inner.write().unwrap().insert(tx);
    }

    pub fn remove(&self, tx: TxId) {
        self.inner.write().unwrap().remove(&tx);
    }

    pub fn contains(&self, tx: TxId) -> bool {
        self.inner.read().unwrap().contains(&tx)
    }

    /// Snapshots the active set under the read lock into an immutable copy.
    pub fn snapshot(&self) -> ActiveSetSnapshot {
        ActiveSetSnapshot(self.inner.read().unwrap().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }
}

impl Default for ActiveSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_independent_of_later_mutation() {
        let active = ActiveSet::new();
        active.insert(1);
        active.insert(2);
        let snap = active.snapshot();
        active.insert(3);
        active.remove(1);

        assert!(snap.contains(1));
        assert!(snap.contains(2));
        assert!(!snap.contains(3));
    }
}
