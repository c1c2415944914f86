//! C3: the SSI certifier's supporting state — the read-lock table and the
//! background worker that sweeps it. The actual dangerous-structure check
//! lives in [`crate::txn::registry::TransactionRegistry::add_rw_antidep_edge`],
//! since the two RW-antidependency bits it tests live on the transaction
//! entries.

pub mod lock_table;
pub mod worker;

pub use lock_table::SIReadLockTable;
pub use worker::{SsiEvent, SsiWorker};
