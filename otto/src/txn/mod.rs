//! C4/C5/C6: transaction identity, the active-transaction set, and the
//! registry of in-flight transactions' undo/SSI bookkeeping.

pub mod active;
pub mod registry;
pub mod transaction;
pub mod txid;

pub use active::{ActiveSet, ActiveSetSnapshot};
pub use registry::{TransactionEntry, TransactionRegistry};
pub use txid::{TxId, TxIdAllocator};
