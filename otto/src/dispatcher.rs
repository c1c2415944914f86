//! Parses the inline request protocol (CRLF-terminated plain-text commands,
//! in the shape `client.go` sends) and drives an [`Engine`], including the
//! implicit
//! single-statement transaction wrapping a bare `SET`/`GET`/`DEL` gets when
//! the client hasn't opened one with `BEGIN`.

use std::sync::Arc;

use crate::client::ClientId;
use crate::engine::Engine;
use crate::error::{CResult, Error};
use crate::txn::txid::TxId;

/// Text used for a `GET`/`DEL` reply that found nothing.
const NIL: &str = "(nil)";

fn wrong_arity(name: &str) -> String {
    format!("ERR wrong number of arguments for '{name}' command")
}

enum WriteKind {
    Set,
    Del,
}

pub struct Dispatcher {
    engine: Arc<Engine>,
}

impl Dispatcher {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Executes one line of the inline protocol and returns the single-line
    /// response to write back (without a trailing CRLF; the caller adds it).
    pub fn execute(&self, client: ClientId, line: &str) -> String {
        let line = line.trim();
        if line.is_empty() {
            return String::new();
        }

        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or("").to_ascii_uppercase();
        let args: Vec<&str> = parts.collect();

        match cmd.as_str() {
            "PING" => "PONG".to_string(),
            "QUIT" => "OK".to_string(),
            "BEGIN" => self.handle_begin(client, &args),
            "COMMIT" => self.handle_commit(client),
            "ABORT" => self.handle_abort(client),
            "SET" => self.handle_write(client, &args, WriteKind::Set),
            "DEL" => self.handle_write(client, &args, WriteKind::Del),
            "GET" => self.handle_get(client, &args),
            "PRINT" => self.handle_print(&args),
            "TXNPRINT" => self.handle_txnprint(client),
            "PRINTW" => self.handle_printw(),
            "STATUS" => self.handle_status(),
            other => format!("ERR unknown command '{other}'"),
        }
    }

    /// Disconnecting a client with an open transaction aborts it, same as
    /// an explicit `ABORT`.
    pub fn on_disconnect(&self, client: ClientId) {
        if let Some(tx) = self.engine.clients.unbind(client) {
            let _ = self.engine.abort(tx);
        }
    }

    /// Runs `f` against the client's bound transaction if it has one open;
    /// otherwise wraps it in an implicit autocommit transaction, committing
    /// on success and aborting on any error that requires it.
    fn with_txn(&self, client: ClientId, f: impl FnOnce(TxId) -> CResult<String>) -> String {
        if let Some(tx) = self.engine.clients.current(client) {
            return match f(tx) {
                Ok(msg) => msg,
                Err(err) => {
                    if err.aborts_transaction() {
                        self.engine.clients.unbind(client);
                        let _ = self.engine.abort(tx);
                    }
                    err.to_string()
                }
            };
        }

        let tx = match self.engine.begin(false) {
            Ok(tx) => tx,
            Err(err) => return err.to_string(),
        };
        match f(tx) {
            Ok(msg) => match self.engine.commit(tx) {
                Ok(()) => msg,
                Err(err) => err.to_string(),
            },
            Err(err) => {
                let _ = self.engine.abort(tx);
                err.to_string()
            }
        }
    }

    fn handle_begin(&self, client: ClientId, args: &[&str]) -> String {
        if self.engine.clients.current(client).is_some() {
            return "ERR transaction already open".to_string();
        }
        let read_only = args.iter().any(|a| a.eq_ignore_ascii_case("READONLY"));
        match self.engine.begin(read_only) {
            Ok(tx) => {
                self.engine.clients.bind(client, tx);
                "OK".to_string()
            }
            Err(err) => err.to_string(),
        }
    }

    fn handle_commit(&self, client: ClientId) -> String {
        match self.engine.clients.unbind(client) {
            None => "ERR no open transaction".to_string(),
            Some(tx) => match self.engine.commit(tx) {
                Ok(()) => "OK".to_string(),
                Err(err) => err.to_string(),
            },
        }
    }

    /// A successful explicit `ABORT` still replies with an error-shaped
    /// string — it reports that the caller's transaction was rolled back,
    /// not that the command itself failed.
    fn handle_abort(&self, client: ClientId) -> String {
        match self.engine.clients.unbind(client) {
            None => "ERR no open transaction".to_string(),
            Some(tx) => match self.engine.abort(tx) {
                Ok(()) => "ERR Aborted txn from manual client call".to_string(),
                Err(err) => err.to_string(),
            },
        }
    }

    fn handle_get(&self, client: ClientId, args: &[&str]) -> String {
        let Some(&key) = args.first() else {
            return wrong_arity("GET");
        };
        self.with_txn(client, |tx| match self.engine.get(tx, key) {
            Ok(value) => Ok(value),
            Err(Error::NotFound(_)) => Ok(NIL.to_string()),
            Err(err) => Err(err),
        })
    }

    fn handle_write(&self, client: ClientId, args: &[&str], kind: WriteKind) -> String {
        match kind {
            WriteKind::Set => {
                if args.len() < 2 {
                    return wrong_arity("SET");
                }
                let key = args[0];
                let value = args[1..].join(" ");
                self.with_txn(client, |tx| self.engine.set(tx, key, value).map(|_| "OK".to_string()))
            }
            WriteKind::Del => {
                let Some(&key) = args.first() else {
                    return wrong_arity("DEL");
                };
                self.with_txn(client, |tx| {
                    self.engine
                        .expire(tx, key)
                        .map(|found| if found { "OK".to_string() } else { NIL.to_string() })
                })
            }
        }
    }

    fn handle_print(&self, args: &[&str]) -> String {
        let Some(&key) = args.first() else {
            return wrong_arity("PRINT");
        };
        self.engine.print_key(key)
    }

    /// Dumps the calling client's own open transaction, looked up through
    /// its `ClientBinding` the same way every other in-transaction command
    /// does — `TXNPRINT` takes no argument of its own.
    fn handle_txnprint(&self, client: ClientId) -> String {
        let Some(tx) = self.engine.clients.current(client) else {
            return "ERR no open transaction".to_string();
        };
        match self.engine.txnprint(tx) {
            Ok(desc) => desc,
            Err(err) => err.to_string(),
        }
    }

    fn handle_printw(&self) -> String {
        match self.engine.printw() {
            Ok(desc) => desc,
            Err(err) => err.to_string(),
        }
    }

    fn handle_status(&self) -> String {
        let status = self.engine.status();
        format!(
            "keys={} tree_depth={} active_txns={}",
            status.key_count, status.tree_depth, status.active_txns
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn dispatcher() -> (Dispatcher, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let engine = Arc::new(Engine::recover(dir.path().join("otto.wal")).unwrap());
        (Dispatcher::new(engine), dir)
    }

    #[test]
    fn autocommit_set_then_get() {
        let (d, _dir) = dispatcher();
        assert_eq!(d.execute(1, "SET a 1"), "OK");
        assert_eq!(d.execute(1, "GET a"), "1");
    }

    #[test]
    fn ping_and_unknown_command() {
        let (d, _dir) = dispatcher();
        assert_eq!(d.execute(1, "PING"), "PONG");
        assert_eq!(d.execute(1, "NOPE"), "ERR unknown command 'NOPE'");
    }

    #[test]
    fn wrong_arity_reports_the_command_name() {
        let (d, _dir) = dispatcher();
        assert_eq!(d.execute(1, "GET"), "ERR wrong number of arguments for 'GET' command");
        assert_eq!(d.execute(1, "SET a"), "ERR wrong number of arguments for 'SET' command");
        assert_eq!(d.execute(1, "DEL"), "ERR wrong number of arguments for 'DEL' command");
        assert_eq!(d.execute(1, "PRINT"), "ERR wrong number of arguments for 'PRINT' command");
    }

    #[test]
    fn txnprint_with_no_open_transaction_errors() {
        let (d, _dir) = dispatcher();
        assert_eq!(d.execute(1, "TXNPRINT"), "ERR no open transaction");
    }

    #[test]
    fn txnprint_dumps_the_callers_own_transaction() {
        let (d, _dir) = dispatcher();
        d.execute(1, "BEGIN");
        d.execute(1, "SET a 1");
        let dump = d.execute(1, "TXNPRINT");
        assert!(dump.contains("inserted"));

        // a second client with no open transaction still gets its own error,
        // not the first client's dump.
        assert_eq!(d.execute(2, "TXNPRINT"), "ERR no open transaction");
    }

    #[test]
    fn explicit_transaction_spans_multiple_statements() {
        let (d, _dir) = dispatcher();
        assert_eq!(d.execute(1, "BEGIN"), "OK");
        assert_eq!(d.execute(1, "SET a 1"), "OK");
        assert_eq!(d.execute(1, "GET a"), "1");
        assert_eq!(d.execute(1, "COMMIT"), "OK");

        assert_eq!(d.execute(2, "GET a"), "1");
    }

    #[test]
    fn abort_rolls_back_the_open_transaction() {
        let (d, _dir) = dispatcher();
        d.execute(1, "BEGIN");
        d.execute(1, "SET a 1");
        assert_eq!(d.execute(1, "ABORT"), "ERR Aborted txn from manual client call");
        assert_eq!(d.execute(2, "GET a"), NIL);
    }

    #[test]
    fn disconnect_aborts_an_open_transaction() {
        let (d, _dir) = dispatcher();
        d.execute(1, "BEGIN");
        d.execute(1, "SET a 1");
        d.on_disconnect(1);
        assert_eq!(d.execute(2, "GET a"), NIL);
    }

    #[test]
    fn del_of_missing_key_replies_nil_without_erroring() {
        let (d, _dir) = dispatcher();
        assert_eq!(d.execute(1, "DEL nope"), NIL);
    }

    #[test]
    fn status_reports_key_count() {
        let (d, _dir) = dispatcher();
        d.execute(1, "SET a 1");
        assert!(d.execute(1, "STATUS").contains("keys=1"));
    }
}
