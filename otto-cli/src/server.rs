//! The inline-protocol TCP listener: one task per connection, each line
//! handed to the shared [`Dispatcher`]. Grounded on `Session::handle_reader`'s
//! line loop, rewritten over `tokio::net` instead of a local `BufRead`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use otto::dispatcher::Dispatcher;
use otto::engine::Engine;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::ServerConfig;

/// Binds the listener and serves connections until `shutdown` fires.
pub async fn run(cfg: &ServerConfig, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let engine = Engine::recover(&cfg.wal_path).context("replaying write-ahead log")?;
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(engine)));

    let listener = TcpListener::bind(cfg.socket_addr())
        .await
        .with_context(|| format!("binding {}", cfg.socket_addr()))?;
    info!("ottodb listening on {}", cfg.socket_addr());

    let next_client_id = Arc::new(AtomicU64::new(1));

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted.context("accepting connection")?;
                let dispatcher = dispatcher.clone();
                let client = next_client_id.fetch_add(1, Ordering::Relaxed);
                info!("client {client} connected from {peer}");
                tokio::spawn(async move {
                    if let Err(err) = serve_connection(client, stream, dispatcher.clone()).await {
                        warn!("client {client} connection error: {err}");
                    }
                    dispatcher.on_disconnect(client);
                    info!("client {client} disconnected");
                });
            }
            _ = shutdown.changed() => {
                info!("shutdown signal received, no longer accepting connections");
                return Ok(());
            }
        }
    }
}

async fn serve_connection(
    client: u64,
    stream: tokio::net::TcpStream,
    dispatcher: Arc<Dispatcher>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await.context("reading request line")? {
        debug!("client {client} -> {line}");
        let is_quit = line.trim().eq_ignore_ascii_case("QUIT");
        let reply = dispatcher.execute(client, &line);
        if reply.is_empty() {
            continue;
        }
        writer.write_all(reply.as_bytes()).await?;
        writer.write_all(b"\r\n").await?;
        writer.flush().await?;
        if is_quit {
            break;
        }
    }
    Ok(())
}
