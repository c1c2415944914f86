//! Drives the real TCP listener end to end: connect, send inline-protocol
//! commands, read the line back.

use std::time::Duration;

use otto_cli::config::ServerConfig;
use otto_cli::server;
use pretty_assertions::assert_eq;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::watch;

async fn start_server() -> (ServerConfig, watch::Sender<bool>) {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = ServerConfig::default();
    cfg.port = 0; // placeholder, overwritten below once we know a free port
    cfg.wal_path = dir.path().join("otto.wal").to_string_lossy().into_owned();

    // Bind on an ephemeral port ourselves so the test doesn't race other
    // tests over a fixed port number.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    cfg.port = addr.port();

    let (tx, rx) = watch::channel(false);
    let cfg_clone = cfg.clone();
    tokio::spawn(async move {
        let _dir = dir;
        server::run(&cfg_clone, rx).await.unwrap();
    });

    // Give the listener a moment to bind before the client connects.
    tokio::time::sleep(Duration::from_millis(50)).await;
    (cfg, tx)
}

async fn roundtrip(stream: &mut TcpStream, cmd: &str) -> String {
    stream.write_all(cmd.as_bytes()).await.unwrap();
    stream.write_all(b"\r\n").await.unwrap();
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    line.trim_end().to_string()
}

#[tokio::test]
async fn ping_over_tcp() {
    let (cfg, _shutdown) = start_server().await;
    let mut stream = TcpStream::connect(cfg.socket_addr()).await.unwrap();
    assert_eq!(roundtrip(&mut stream, "PING").await, "PONG");
}

#[tokio::test]
async fn set_and_get_over_tcp() {
    let (cfg, _shutdown) = start_server().await;
    let mut stream = TcpStream::connect(cfg.socket_addr()).await.unwrap();
    assert_eq!(roundtrip(&mut stream, "SET k1 bananas").await, "OK");
    assert_eq!(roundtrip(&mut stream, "GET k1").await, "bananas");
}

#[tokio::test]
async fn missing_key_replies_nil() {
    let (cfg, _shutdown) = start_server().await;
    let mut stream = TcpStream::connect(cfg.socket_addr()).await.unwrap();
    assert_eq!(roundtrip(&mut stream, "GET nope").await, "(nil)");
}
