use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use xfl_server::{MemoryXfl, ServerConfig};

/// Serves the RPC surface against an in-memory application.
#[derive(Parser, Debug)]
#[command(name = "xfl_headless")]
struct Args {
    /// Listen address; falls back to XFL_SERVER_ADDR, then 127.0.0.1:8080.
    #[arg(long)]
    addr: Option<String>,

    /// Write the bound address to this file once listening.
    #[arg(long, value_name = "PATH")]
    addr_file: Option<PathBuf>,

    /// Stop after this many milliseconds.
    #[arg(long)]
    run_for_ms: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::from_env();
    if let Some(addr) = args.addr {
        config = config.with_addr(addr);
    }

    let (server, mut owner) = xfl_server::start(config).context("failed to start server")?;

    if let Some(path) = &args.addr_file {
        std::fs::write(path, server.local_addr().to_string())
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    let deadline = args
        .run_for_ms
        .map(|ms| Instant::now() + Duration::from_millis(ms));

    // The owner loop keeps this thread until `exit`, the deadline, or a stop.
    let mut xfl = MemoryXfl::new();
    owner.run_until(&mut xfl, deadline);

    server.stop();
    Ok(())
}
