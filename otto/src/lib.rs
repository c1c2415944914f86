//! `otto` is OttoDB's transactional storage core: an in-memory MVCC
//! key-value store with snapshot-isolation visibility rules, a serializable
//! snapshot isolation (SSI) certifier, and a write-ahead log for crash
//! recovery.
//!
//! ## Getting started
//!
//! ```rust
//! use otto::engine::Engine;
//!
//! fn run() -> otto::error::CResult<()> {
//!     let dir = tempfile::tempdir().unwrap();
//!     let engine = Engine::recover(dir.path().join("otto.wal"))?;
//!
//!     let tx = engine.begin(false)?;
//!     engine.set(tx, "a", "1".to_string())?;
//!     engine.commit(tx)?;
//!
//!     let reader = engine.begin(true)?;
//!     assert_eq!(engine.get(reader, "a")?, "1");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod ssi;
pub mod store;
pub mod txn;
pub mod wal;
