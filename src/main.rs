//! minircd - a minimal IRC server.
//!
//! Single process, single thread: one poll-driven readiness loop serves
//! every client connection on one listening port, guarded by a shared
//! admission password.

mod config;
mod error;
mod handlers;
mod network;
mod state;

use std::process;

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::network::Server;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = match ServerConfig::from_args(std::env::args()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let mut server = Server::new(config.port, config.password);
    if let Err(e) = server.setup() {
        error!(error = %e, "failed to set up server");
        process::exit(1);
    }

    // Signals land on a dedicated thread that only requests a stop; the
    // loop observes the flag between iterations and tears down in order.
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let stop = server.stop_handle();
    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            info!(signal, "signal received, shutting down");
            stop.stop();
        }
    });

    if let Some(addr) = server.local_addr() {
        info!(%addr, "ready for connections");
    }
    server.run()?;
    info!("server stopped");
    Ok(())
}
