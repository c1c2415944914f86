//! C2: VersionedTree — an unbalanced BST keyed by the record key, with a
//! per-key version list at each node. Grounded on `binTree.go`'s
//! `Search`/iterative insert/`Expire`/`ExpireReplay` methods, kept as an
//! actual BST (not a `BTreeMap`) to preserve that file's degenerate-tree
//! behavior under sorted-key insertion.
//!
//! Lock order: the tree-structure lock is always acquired before a node's
//! version-list mutex.

use std::cmp::Ordering;
use std::sync::{Mutex, RwLock};

use crate::error::{CResult, Error};
use crate::ssi::SIReadLockTable;
use crate::store::record::{concurrent_edited, visible, Record, TxnStatus};
use crate::txn::active::ActiveSetSnapshot;
use crate::txn::registry::{TransactionEntry, TransactionRegistry};
use crate::txn::txid::TxId;

struct Node {
    key: String,
    versions: Mutex<Vec<Record>>,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

impl Node {
    fn leaf(key: String) -> Box<Node> {
        Box::new(Node { key, versions: Mutex::new(Vec::new()), left: None, right: None })
    }
}

/// Node count and max depth, used by the `PRINT`/status surface to flag a
/// degenerate (effectively linked-list) tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    pub key_count: usize,
    pub depth: usize,
}

pub struct VersionedTree {
    root: RwLock<Option<Box<Node>>>,
}

impl VersionedTree {
    pub fn new() -> Self {
        Self { root: RwLock::new(None) }
    }

    fn find_node<'a>(root: &'a Option<Box<Node>>, key: &str) -> Option<&'a Node> {
        let mut cur = root;
        loop {
            match cur {
                None => return None,
                Some(node) => match key.cmp(node.key.as_str()) {
                    Ordering::Equal => return Some(node),
                    Ordering::Less => cur = &node.left,
                    Ordering::Greater => cur = &node.right,
                },
            }
        }
    }

    /// Iterative search-or-insert, mirroring the Go original's insert loop
    /// rather than a recursive one, so deep skewed trees don't blow the stack.
    fn insert_node<'a>(root: &'a mut Option<Box<Node>>, key: &str) -> &'a mut Node {
        let mut cur = root;
        loop {
            if cur.is_none() {
                *cur = Some(Node::leaf(key.to_string()));
            }
            let node = cur.as_mut().unwrap();
            match key.cmp(node.key.as_str()) {
                Ordering::Equal => return node,
                Ordering::Less => cur = &mut node.left,
                Ordering::Greater => cur = &mut node.right,
            }
        }
    }

    /// `Get(tx, key)`. Walks the version list newest-first
    /// and returns the first visible record; if that record also flags an
    /// RW-antidependency (the concurrently-tombstoned case), reports the
    /// edge to the registry before returning.
    pub fn get(
        &self,
        tx: TxId,
        key: &str,
        active: &ActiveSetSnapshot,
        registry: &TransactionRegistry,
        si_table: &SIReadLockTable,
    ) -> CResult<String> {
        let root = self.root.read().unwrap();
        let node = Self::find_node(&root, key).ok_or_else(|| Error::NotFound(key.to_string()))?;
        let versions = node.versions.lock().unwrap();

        for record in versions.iter().rev() {
            let v = visible(record, tx, active);
            if v.visible {
                si_table.add_reader(key, tx);
                // Only the concurrently-tombstoned case is both visible and
                // flagged: the reader forms an RW-antidep edge onto the
                // concurrent deleter, not onto a future/concurrent writer it
                // never actually saw.
                if v.rw_antidep {
                    registry.add_rw_antidep_edge(tx, record.expired_by)?;
                }
                return Ok(record.value.clone());
            }
        }
        Err(Error::NotFound(key.to_string()))
    }

    /// `Set(tx, key, value)`: checks the current head record
    /// for a conflicting concurrent writer, then fences against existing
    /// readers of `key`, then appends a new version.
    pub fn set(
        &self,
        tx: TxId,
        key: &str,
        value: String,
        active: &ActiveSetSnapshot,
        registry: &TransactionRegistry,
        si_table: &SIReadLockTable,
    ) -> CResult<()> {
        let mut root = self.root.write().unwrap();
        let node = Self::insert_node(&mut root, key);
        let index = {
            let mut versions = node.versions.lock().unwrap();
            if let Some(last) = versions.last() {
                concurrent_edited(last, tx, active)
                    .map_err(|reason| Error::Conflict(reason.message().to_string()))?;
            }
            for reader in si_table.readers_of(key, tx) {
                registry.add_rw_antidep_edge(reader, tx)?;
            }
            versions.push(Record::new(value, tx));
            versions.len() - 1
        };
        drop(root);
        registry.record_insert(tx, key, index);
        Ok(())
    }

    /// `Expire(tx, key)`: tombstones the current head record
    /// rather than appending a new version. Returns `false` (a no-op, not an
    /// error) when the key is missing or already tombstoned for good.
    pub fn expire(
        &self,
        tx: TxId,
        key: &str,
        active: &ActiveSetSnapshot,
        registry: &TransactionRegistry,
        si_table: &SIReadLockTable,
    ) -> CResult<bool> {
        let root = self.root.read().unwrap();
        let node = match Self::find_node(&root, key) {
            Some(node) => node,
            None => return Ok(false),
        };
        let index = {
            let mut versions = node.versions.lock().unwrap();
            let idx = versions.len() - 1;
            {
                let last = &versions[idx];
                concurrent_edited(last, tx, active)
                    .map_err(|reason| Error::Conflict(reason.message().to_string()))?;
                if last.expired_by != 0 {
                    return Ok(false);
                }
            }
            for reader in si_table.readers_of(key, tx) {
                registry.add_rw_antidep_edge(reader, tx)?;
            }
            let last = &mut versions[idx];
            last.prior_expired_by = last.expired_by;
            last.expired_by = tx;
            idx
        };
        drop(root);
        registry.record_expire(tx, key, index);
        Ok(true)
    }

    /// Applies an already-committed `SET` read back from the WAL. No
    /// conflict checks, no SSI edges: recovery is single-threaded and the
    /// frame was only ever written after the original transaction committed.
    pub fn set_replay(&self, tx: TxId, key: &str, value: String) {
        let mut root = self.root.write().unwrap();
        let node = Self::insert_node(&mut root, key);
        let mut versions = node.versions.lock().unwrap();
        let mut record = Record::new(value, tx);
        record.status = TxnStatus::Committed;
        versions.push(record);
    }

    /// Applies an already-committed `DEL` read back from the WAL.
    pub fn expire_replay(&self, tx: TxId, key: &str) {
        let root = self.root.read().unwrap();
        if let Some(node) = Self::find_node(&root, key) {
            let mut versions = node.versions.lock().unwrap();
            if let Some(last) = versions.last_mut() {
                last.prior_expired_by = last.expired_by;
                last.expired_by = tx;
            }
        }
    }

    /// `Abort(tx)`: undoes exactly the `(key, index)` pairs the aborting
    /// transaction recorded, using arena-index bookkeeping instead of raw
    /// pointers.
    pub fn abort(&self, entry: &TransactionEntry) {
        let root = self.root.read().unwrap();
        for (key, idx) in &entry.inserted {
            if let Some(node) = Self::find_node(&root, key) {
                let mut versions = node.versions.lock().unwrap();
                if let Some(r) = versions.get_mut(*idx) {
                    r.status = TxnStatus::Aborted;
                }
            }
        }
        for (key, idx) in &entry.expired {
            if let Some(node) = Self::find_node(&root, key) {
                let mut versions = node.versions.lock().unwrap();
                if let Some(r) = versions.get_mut(*idx) {
                    r.expired_by = r.prior_expired_by;
                    r.prior_expired_by = 0;
                }
            }
        }
    }

    /// Marks a committing transaction's inserted records `Committed`. Not
    /// load-bearing for `Visible`/`ConcurrentEdited` (those key off active-set
    /// membership, not this flag) but kept for `TXNPRINT`/`PRINT` fidelity.
    pub fn commit(&self, entry: &TransactionEntry) {
        let root = self.root.read().unwrap();
        for (key, idx) in &entry.inserted {
            if let Some(node) = Self::find_node(&root, key) {
                let mut versions = node.versions.lock().unwrap();
                if let Some(r) = versions.get_mut(*idx) {
                    r.status = TxnStatus::Committed;
                }
            }
        }
    }

    /// Renders every version of `key`, for the `PRINT` command.
    pub fn describe_key(&self, key: &str) -> Option<String> {
        let root = self.root.read().unwrap();
        let node = Self::find_node(&root, key)?;
        let versions = node.versions.lock().unwrap();
        let mut out = format!("key: {key}\n");
        for (i, r) in versions.iter().enumerate() {
            out.push_str(&format!(
                "  [{i}] value={:?} created_by={} expired_by={} status={:?}\n",
                r.value, r.created_by, r.expired_by, r.status
            ));
        }
        Some(out)
    }

    pub fn stats(&self) -> TreeStats {
        fn walk(node: &Option<Box<Node>>) -> (usize, usize) {
            match node {
                None => (0, 0),
                Some(n) => {
                    let (lcount, ldepth) = walk(&n.left);
                    let (rcount, rdepth) = walk(&n.right);
                    (lcount + rcount + 1, 1 + ldepth.max(rdepth))
                }
            }
        }
        let root = self.root.read().unwrap();
        let (key_count, depth) = walk(&root);
        TreeStats { key_count, depth }
    }
}

impl Default for VersionedTree {
    fn default() -> Self {
        Self::new()
    }
}
