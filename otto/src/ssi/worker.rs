//! Background SSI sweeper, grounded on `ssiWorker.go`: a dedicated goroutine
//! there drains a channel of begin/end events so the hot transaction path
//! never blocks on the read-lock table's upkeep. We mirror that with a
//! `std::thread` draining a `sync_channel`; `Engine::commit`/`abort` hand the
//! event off and return immediately, and this thread is the one that
//! actually sweeps `SIReadLockTable` for the transaction that just ended.

use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::ssi::lock_table::SIReadLockTable;
use crate::txn::txid::TxId;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy)]
pub enum SsiEvent {
    TxStarted(TxId),
    TxEnded(TxId),
}

pub struct SsiWorker {
    sender: SyncSender<SsiEvent>,
    handle: Option<JoinHandle<()>>,
}

impl SsiWorker {
    /// Spawns the draining thread against the engine's own read-lock table.
    /// Dropping the returned worker closes the channel and joins the thread,
    /// so every already-queued sweep still runs before shutdown completes.
    pub fn spawn(si_table: Arc<SIReadLockTable>) -> Self {
        let (sender, receiver) = sync_channel::<SsiEvent>(CHANNEL_CAPACITY);
        let handle = std::thread::Builder::new()
            .name("otto-ssi-worker".into())
            .spawn(move || {
                while let Ok(event) = receiver.recv() {
                    match event {
                        SsiEvent::TxStarted(tx) => {
                            log::trace!("ssi: txn {tx} started");
                        }
                        SsiEvent::TxEnded(tx) => {
                            si_table.forget(tx);
                            log::trace!("ssi: txn {tx} ended, read locks swept");
                        }
                    }
                }
            })
            .expect("failed to spawn otto-ssi-worker thread");

        Self { sender, handle: Some(handle) }
    }

    /// Non-blocking best-effort notification; a full channel drops the event
    /// rather than stall a transaction on tracing.
    pub fn notify(&self, event: SsiEvent) {
        if self.sender.try_send(event).is_err() {
            log::debug!("ssi worker channel full, dropping trace event");
        }
    }
}

impl Drop for SsiWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
