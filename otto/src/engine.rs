//! `Engine` owns every piece of shared state and exposes the operations
//! the dispatcher drives. Recovery is grounded on `oplog.go::ReplayLog`:
//! redo records are buffered per transaction and replayed for every
//! transaction that isn't excluded by an `abort` frame.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::client::ClientBinding;
use crate::error::{CResult, Error};
use crate::ssi::{SIReadLockTable, SsiEvent, SsiWorker};
use crate::store::tree::{TreeStats, VersionedTree};
use crate::txn::active::ActiveSet;
use crate::txn::registry::TransactionRegistry;
use crate::txn::transaction::{self};
use crate::txn::txid::{TxId, TxIdAllocator};
use crate::wal::{Wal, WalFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStatus {
    pub key_count: usize,
    pub tree_depth: usize,
    pub active_txns: usize,
}

enum PendingOp {
    Set(String, String),
    Del(String),
}

pub struct Engine {
    tree: VersionedTree,
    si_table: Arc<SIReadLockTable>,
    registry: TransactionRegistry,
    active: ActiveSet,
    txid: TxIdAllocator,
    wal: Mutex<Wal>,
    ssi_worker: SsiWorker,
    pub clients: ClientBinding,
}

impl Engine {
    /// Opens (or creates) the WAL at `path` and replays it to rebuild the
    /// tree.
    ///
    /// Grounded on `oplog.go::ReplayLog`: a transaction survives unless an
    /// `abort` frame is seen for it. There is no commit frame — a
    /// transaction whose writes made it into the WAL but whose process died
    /// before it could abort is replayed as committed.
    pub fn recover(path: impl AsRef<Path>) -> CResult<Self> {
        let mut wal = Wal::open(path)?;
        let frames = wal.replay()?;

        let tree = VersionedTree::new();
        let mut pending: HashMap<TxId, Vec<PendingOp>> = HashMap::new();
        let mut max_tx: TxId = 0;

        for frame in &frames {
            max_tx = max_tx.max(frame.tx_id());
            match frame {
                WalFrame::Set { tx, key, value } => {
                    pending.entry(*tx).or_default().push(PendingOp::Set(key.clone(), value.clone()));
                }
                WalFrame::Del { tx, key } => {
                    pending.entry(*tx).or_default().push(PendingOp::Del(key.clone()));
                }
                WalFrame::Abort { tx } => {
                    pending.remove(tx);
                }
            }
        }

        let mut surviving: Vec<TxId> = pending.keys().copied().collect();
        surviving.sort_unstable();
        for tx in surviving {
            for op in pending.remove(&tx).unwrap_or_default() {
                match op {
                    PendingOp::Set(key, value) => tree.set_replay(tx, &key, value),
                    PendingOp::Del(key) => tree.expire_replay(tx, &key),
                }
            }
        }

        log::info!("recovered {} key(s) from {} WAL frame(s)", tree.stats().key_count, frames.len());

        let si_table = Arc::new(SIReadLockTable::new());
        let ssi_worker = SsiWorker::spawn(si_table.clone());

        Ok(Self {
            tree,
            si_table,
            registry: TransactionRegistry::new(),
            active: ActiveSet::new(),
            txid: TxIdAllocator::starting_at(max_tx + 1),
            wal: Mutex::new(wal),
            ssi_worker,
            clients: ClientBinding::new(),
        })
    }

    pub fn begin(&self, read_only: bool) -> CResult<TxId> {
        let tx = self.txid.next();
        self.registry.begin(tx, read_only);
        self.active.insert(tx);
        self.ssi_worker.notify(SsiEvent::TxStarted(tx));
        Ok(tx)
    }

    pub fn get(&self, tx: TxId, key: &str) -> CResult<String> {
        let active = self.active.snapshot();
        self.tree.get(tx, key, &active, &self.registry, &self.si_table)
    }

    pub fn set(&self, tx: TxId, key: &str, value: String) -> CResult<()> {
        let active = self.active.snapshot();
        self.tree.set(tx, key, value.clone(), &active, &self.registry, &self.si_table)?;
        self.wal.lock().unwrap().append(&WalFrame::Set { tx, key: key.to_string(), value })?;
        Ok(())
    }

    /// Returns `true` if a live version was tombstoned, `false` for the
    /// no-op case (missing key or already-tombstoned key).
    pub fn expire(&self, tx: TxId, key: &str) -> CResult<bool> {
        let active = self.active.snapshot();
        let found = self.tree.expire(tx, key, &active, &self.registry, &self.si_table)?;
        if found {
            self.wal.lock().unwrap().append(&WalFrame::Del { tx, key: key.to_string() })?;
        }
        Ok(found)
    }

    /// A commit writes no WAL frame of its own: recovery treats any
    /// transaction without an `abort` frame as committed, so the frames its
    /// writes already appended are the only durable record it needs.
    ///
    /// Sweeping `tx`'s entries out of the read-lock table is handed off to
    /// the SSI worker rather than done inline here, so a commit never blocks
    /// on the table's lock.
    pub fn commit(&self, tx: TxId) -> CResult<()> {
        let entry = self
            .registry
            .remove(tx)
            .ok_or_else(|| Error::BadRequest(format!("no such open transaction {tx}")))?;
        self.tree.commit(&entry);
        self.active.remove(tx);
        self.ssi_worker.notify(SsiEvent::TxEnded(tx));
        Ok(())
    }

    pub fn abort(&self, tx: TxId) -> CResult<()> {
        let entry = self
            .registry
            .remove(tx)
            .ok_or_else(|| Error::BadRequest(format!("no such open transaction {tx}")))?;
        self.tree.abort(&entry);
        self.active.remove(tx);
        self.ssi_worker.notify(SsiEvent::TxEnded(tx));
        if !entry.read_only {
            self.wal.lock().unwrap().append(&WalFrame::Abort { tx })?;
        }
        Ok(())
    }

    pub fn print_key(&self, key: &str) -> String {
        self.tree.describe_key(key).unwrap_or_else(|| format!("key {key:?} not found\n"))
    }

    pub fn txnprint(&self, tx: TxId) -> CResult<String> {
        let entry = self
            .registry
            .describe(tx)
            .ok_or_else(|| Error::NotFound(format!("txn {tx}")))?;
        Ok(transaction::describe(tx, &entry))
    }

    pub fn printw(&self) -> CResult<String> {
        self.wal.lock().unwrap().print_frames()
    }

    pub fn status(&self) -> EngineStatus {
        let TreeStats { key_count, depth } = self.tree.stats();
        EngineStatus { key_count, tree_depth: depth, active_txns: self.active.len() }
    }
}
