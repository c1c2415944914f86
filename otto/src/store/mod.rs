//! C1/C2: the versioned record store.

pub mod record;
pub mod tree;

pub use record::{concurrent_edited, visible, ConflictReason, Record, TxnStatus, Visibility};
pub use tree::{TreeStats, VersionedTree};
