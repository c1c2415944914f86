//! C3: SIReadLockTable — per-key bookkeeping of which transactions have read
//! a key, grounded on `ssiLockTable.go`. The certifier consults this table to
//! find the readers a writer must fence against.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::txn::txid::TxId;

pub struct SIReadLockTable {
    inner: RwLock<HashMap<String, Vec<TxId>>>,
}

impl SIReadLockTable {
    pub fn new() -> Self {
        Self { inner: RwLock::new(HashMap::new()) }
    }

    /// Records that `tx` read `key`. A transaction may read the same key
    /// more than once; it's only recorded once.
    pub fn add_reader(&self, key: &str, tx: TxId) {
        let mut map = self.inner.write().unwrap();
        let readers = map.entry(key.to_string()).or_default();
        if !readers.contains(&tx) {
            readers.push(tx);
        }
    }

    /// The transactions currently on record as having read `key`, other than
    /// `exclude` itself.
    pub fn readers_of(&self, key: &str, exclude: TxId) -> Vec<TxId> {
        self.inner
            .read()
            .unwrap()
            .get(key)
            .map(|readers| readers.iter().copied().filter(|&r| r != exclude).collect())
            .unwrap_or_default()
    }

    /// Drops every entry naming `tx` as a reader. Called once a transaction
    /// commits or aborts — stale reader records don't affect correctness
    /// (a gone transaction is never in the active set) but they would leak.
    pub fn forget(&self, tx: TxId) {
        let mut map = self.inner.write().unwrap();
        for readers in map.values_mut() {
            readers.retain(|&r| r != tx);
        }
        map.retain(|_, readers| !readers.is_empty());
    }
}

impl Default for SIReadLockTable {
    fn default() -> Self {
        Self::new()
    }
}
