mod client;
mod logging;
mod server;
mod snapshot;
mod state;
mod transport;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use crate::server::{ConnectionAcceptor, ConnectionHandler, ServiceSupervisor};
use crate::snapshot::{SnapshotStore, SnapshotWorker};
use crate::state::NumberSet;

#[derive(Parser, Debug)]
#[command(name = "sumsq")]
#[command(about = "TCP service returning the sum of squares over all distinct numbers seen")]
struct Opts {
    #[command(subcommand)]
    cmd: Mode,
}

/// CLI modes
#[derive(Subcommand, Debug)]
enum Mode {
    /// Run the TCP server
    Server {
        #[arg(short, long, default_value = "127.0.0.1:9999")]
        addr: String,

        /// Snapshot file path
        #[arg(long, default_value = "numbers.snapshot")]
        snapshot_path: PathBuf,

        /// Seconds between snapshots
        #[arg(long, default_value_t = 10)]
        snapshot_period_secs: u64,

        /// Bound on handling a single number, in milliseconds
        #[arg(long, default_value_t = 1000)]
        handle_timeout_millis: u64,

        /// Bound on the graceful shutdown drain, in seconds
        #[arg(long, default_value_t = 30)]
        shutdown_timeout_secs: u64,
    },

    /// Send numbers to a running server and print the aggregates
    Client {
        #[command(flatten)]
        client: client::ClientArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let opts = Opts::parse();
    match opts.cmd {
        Mode::Server {
            addr,
            snapshot_path,
            snapshot_period_secs,
            handle_timeout_millis,
            shutdown_timeout_secs,
        } => {
            run_server(
                &addr,
                snapshot_path,
                Duration::from_secs(snapshot_period_secs),
                Duration::from_millis(handle_timeout_millis),
                Duration::from_secs(shutdown_timeout_secs),
            )
            .await?;
        }

        Mode::Client { client } => {
            client::run_client(client).await?;
        }
    }
    Ok(())
}

async fn run_server(
    addr: &str,
    snapshot_path: PathBuf,
    snapshot_period: Duration,
    handle_timeout: Duration,
    shutdown_timeout: Duration,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind tcp listener on {addr}"))?;

    let numbers = Arc::new(NumberSet::new());

    let handler = ConnectionHandler::new(Arc::clone(&numbers)).with_handle_timeout(handle_timeout);
    let acceptor = Arc::new(
        ConnectionAcceptor::new(listener, handler).context("inspect listener address")?,
    );
    info!(addr = %acceptor.local_addr(), "listening");

    let store = SnapshotStore::new(snapshot_path);
    let worker = Arc::new(SnapshotWorker::new(numbers, store, snapshot_period));

    ServiceSupervisor::new(acceptor, worker, shutdown_timeout)
        .run()
        .await
}
