//! C4: TransactionRegistry — TxID -> Transaction bookkeeping, plus the two
//! RW-antidependency bits each transaction carries for the SSI certifier.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{CResult, Error};
use crate::txn::txid::TxId;

/// Bookkeeping for one open transaction. Records are referenced by
/// `(key, index into that key's version list)` rather than raw pointers,
/// so undo on abort is a matter of looking the pair back up in the tree.
#[derive(Debug, Default, Clone)]
pub struct TransactionEntry {
    pub read_only: bool,
    pub inserted: Vec<(String, usize)>,
    pub expired: Vec<(String, usize)>,
    rw_anti_dep_in: bool,
    rw_anti_dep_out: bool,
}

impl TransactionEntry {
    fn new(read_only: bool) -> Self {
        Self { read_only, ..Default::default() }
    }
}

pub struct TransactionRegistry {
    inner: RwLock<HashMap<TxId, TransactionEntry>>,
}

impl TransactionRegistry {
    pub fn new() -> Self {
        Self { inner: RwLock::new(HashMap::new()) }
    }

    pub fn begin(&self, tx: TxId, read_only: bool) {
        self.inner.write().unwrap().insert(tx, TransactionEntry::new(read_only));
    }

    pub fn contains(&self, tx: TxId) -> bool {
        self.inner.read().unwrap().contains_key(&tx)
    }

    pub fn record_insert(&self, tx: TxId, key: &str, index: usize) {
        if let Some(entry) = self.inner.write().unwrap().get_mut(&tx) {
            entry.inserted.push((key.to_string(), index));
        }
    }

    pub fn record_expire(&self, tx: TxId, key: &str, index: usize) {
        if let Some(entry) = self.inner.write().unwrap().get_mut(&tx) {
            entry.expired.push((key.to_string(), index));
        }
    }

    /// Removes and returns a transaction's bookkeeping, e.g. on commit/abort.
    pub fn remove(&self, tx: TxId) -> Option<TransactionEntry> {
        self.inner.write().unwrap().remove(&tx)
    }

    pub fn describe(&self, tx: TxId) -> Option<TransactionEntry> {
        self.inner.read().unwrap().get(&tx).cloned()
    }

    /// Adds an RW-antidependency edge `from -> to`. Silently drops the
    /// edge if either endpoint is no longer in the registry (it ended
    /// between the visibility check and this call).
    pub fn add_rw_antidep_edge(&self, from: TxId, to: TxId) -> CResult<()> {
        let mut map = self.inner.write().unwrap();
        let (from_already_in, to_already_out) = match (map.get(&from), map.get(&to)) {
            (Some(f), Some(t)) => (f.rw_anti_dep_in, t.rw_anti_dep_out),
            _ => return Ok(()),
        };

        if from_already_in || to_already_out {
            return Err(Error::Serialization(format!(
                "dangerous structure: txn {from} and txn {to} would both gain in/out RW-antidependency edges"
            )));
        }

        map.get_mut(&from).unwrap().rw_anti_dep_out = true;
        map.get_mut(&to).unwrap().rw_anti_dep_in = true;
        Ok(())
    }
}

impl Default for TransactionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_is_dropped_silently_if_an_endpoint_is_gone() {
        let reg = TransactionRegistry::new();
        reg.begin(1, false);
        assert!(reg.add_rw_antidep_edge(1, 2).is_ok());
        assert!(reg.add_rw_antidep_edge(2, 1).is_ok());
    }

    #[test]
    fn second_edge_completing_a_pivot_fails() {
        let reg = TransactionRegistry::new();
        reg.begin(1, false);
        reg.begin(2, false);
        reg.begin(3, false);

        // 1 -> 2 : 1.out=1, 2.in=1
        reg.add_rw_antidep_edge(1, 2).unwrap();
        // 2 -> 3 is fine, 2 already has in=1 but that's not checked on the `to` side
        reg.add_rw_antidep_edge(2, 3).unwrap();
        // 3 -> 1: from=3 (in=0), to=1 (out=1) -> to_already_out fails
        assert!(reg.add_rw_antidep_edge(3, 1).is_err());
    }

    #[test]
    fn undo_bookkeeping_round_trips() {
        let reg = TransactionRegistry::new();
        reg.begin(7, false);
        reg.record_insert(7, "a", 0);
        reg.record_expire(7, "b", 2);
        let entry = reg.describe(7).unwrap();
        assert_eq!(entry.inserted, vec![("a".to_string(), 0)]);
        assert_eq!(entry.expired, vec![("b".to_string(), 2)]);
    }
}
