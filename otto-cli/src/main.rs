use std::env;
use std::panic;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::sync::watch;

use otto_cli::config::ServerConfig;
use otto_cli::{server, trace};

#[derive(Debug, Parser, PartialEq)]
#[command(version, author, about = "OttoDB: an in-memory MVCC key-value store")]
struct Args {
    /// Address to bind the inline-protocol TCP listener to.
    #[clap(long)]
    bind_addr: Option<String>,

    /// Port to bind the inline-protocol TCP listener to.
    #[clap(short = 'p', long)]
    port: Option<u16>,

    /// Path to the write-ahead log.
    #[clap(long)]
    wal_path: Option<String>,

    #[clap(short = 'l', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_panic_hooks();

    eprintln!();
    eprintln!("██  ██  █        █");
    eprintln!("██ ██   ██      ██");
    eprintln!("███      ██    ██");
    eprintln!("██ ██     ██  ██");
    eprintln!("██  ██     ████  OttoDB");
    eprintln!();

    let args = Args::parse();

    let log_dir = format!("{}/.ottodb", std::env::var("HOME").unwrap_or_else(|_| ".".to_string()));
    let _guards = trace::init_logging(&log_dir, &args.log_level).await?;

    let mut cfg = ServerConfig::load().unwrap_or_else(|err| {
        log::warn!("failed to load config, using defaults: {err}");
        ServerConfig::default()
    });
    if let Some(bind_addr) = args.bind_addr {
        cfg.bind_addr = bind_addr;
    }
    if let Some(port) = args.port {
        cfg.port = port;
    }
    if let Some(wal_path) = args.wal_path {
        cfg.wal_path = wal_path;
    }
    info!("ottodb starting with config: {:?}", &cfg);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        if r.swap(false, Ordering::SeqCst) {
            eprintln!("received Ctrl+C, shutting down");
            let _ = shutdown_tx.send(true);
        }
    })
    .expect("error setting Ctrl-C handler");

    server::run(&cfg, shutdown_rx).await
}

fn setup_panic_hooks() {
    let meta = human_panic::Metadata {
        version: env!("CARGO_PKG_VERSION").into(),
        name: env!("CARGO_PKG_NAME").into(),
        authors: env!("CARGO_PKG_AUTHORS").replace(':', ", ").into(),
        homepage: env!("CARGO_PKG_HOMEPAGE").into(),
    };

    let default_hook = panic::take_hook();
    if env::var("RUST_BACKTRACE").is_err() {
        panic::set_hook(Box::new(move |info: &panic::PanicInfo| {
            default_hook(info);
            let file_path = human_panic::handle_dump(&meta, info);
            human_panic::print_msg(file_path, &meta)
                .expect("human-panic: printing error message to console failed");
        }));
    }
}
