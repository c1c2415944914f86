//! `otto-cli` wires an [`otto::engine::Engine`] up to the inline-protocol
//! TCP listener; `src/main.rs` is a thin binary shell around the pieces
//! here so integration tests can drive [`server::run`] directly.

pub mod config;
pub mod server;
pub mod trace;
