//! Server configuration, loaded with `confy`, trimmed down to what a TCP
//! server actually needs: where to bind, where the WAL lives, how verbose
//! to log.

use serde_derive::{Deserialize, Serialize};

pub const DEFAULT_PROMPT: &str = "ottodb";
const DEFAULT_WAL_PATH: &str = "ottodb.wal";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the inline-protocol TCP listener binds to.
    pub bind_addr: String,

    /// Port the inline-protocol TCP listener binds to.
    pub port: u16,

    /// Path to the write-ahead log, relative to the working directory
    /// unless absolute.
    pub wal_path: String,

    /// `log`-crate level filter name (`"error"`, `"warn"`, `"info"`, ...).
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            wal_path: DEFAULT_WAL_PATH.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Loads `ottodb.toml` from the platform config directory via `confy`,
    /// falling back to defaults (and writing them out) if it doesn't exist
    /// yet. A malformed file is reported rather than silently discarded.
    pub fn load() -> anyhow::Result<Self> {
        let cfg: ServerConfig = confy::load(DEFAULT_PROMPT, None)?;
        Ok(cfg)
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}
