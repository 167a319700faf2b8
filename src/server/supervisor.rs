use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::server::acceptor::ConnectionAcceptor;
use crate::snapshot::worker::SnapshotWorker;
use crate::transport::shutdown::{self, ShutdownCoordinator};

/// Owns the lifecycle of the accept loop and the snapshot worker.
///
/// Runs both concurrently, waits for a termination signal or for
/// either task to end on its own (which is unrecoverable), then shuts
/// both down under one bounded timeout. If the drain does not finish
/// in time the supervisor returns anyway.
pub struct ServiceSupervisor {
    acceptor: Arc<ConnectionAcceptor>,
    worker: Arc<SnapshotWorker>,
    shutdown_timeout: Duration,
}

impl ServiceSupervisor {
    pub fn new(
        acceptor: Arc<ConnectionAcceptor>,
        worker: Arc<SnapshotWorker>,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            acceptor,
            worker,
            shutdown_timeout,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let coordinator = ShutdownCoordinator::new();
        let shutdown_rx = coordinator.subscribe();
        tokio::spawn(async move {
            coordinator.wait_for_signal().await;
        });

        let mut serve_task = tokio::spawn(Arc::clone(&self.acceptor).serve());
        let mut worker_task = tokio::spawn(Arc::clone(&self.worker).run());

        // (cause of termination, which background tasks already ended)
        let (failure, serve_done, worker_done) = tokio::select! {
            _ = shutdown::wait_for_shutdown(shutdown_rx) => {
                info!("shutdown requested");
                (None, false, false)
            }
            joined = &mut serve_task => {
                let err = match joined {
                    Ok(Ok(())) => anyhow!("accept loop stopped unexpectedly"),
                    Ok(Err(err)) => anyhow::Error::new(err).context("accept loop failed"),
                    Err(err) => anyhow::Error::new(err).context("accept loop panicked"),
                };
                (Some(err), true, false)
            }
            joined = &mut worker_task => {
                let err = match joined {
                    Ok(()) => anyhow!("snapshot worker stopped unexpectedly"),
                    Err(err) => anyhow::Error::new(err).context("snapshot worker panicked"),
                };
                (Some(err), false, true)
            }
        };

        let acceptor = Arc::clone(&self.acceptor);
        let worker = Arc::clone(&self.worker);
        let drain = async move {
            let (acceptor_res, worker_res) =
                tokio::join!(acceptor.shutdown(), worker.shutdown());
            if let Err(err) = acceptor_res {
                warn!(error = %err, "acceptor shutdown");
            }
            if let Err(err) = worker_res {
                warn!(error = %err, "snapshot worker shutdown");
            }
            if !serve_done {
                let _ = serve_task.await;
            }
            if !worker_done {
                let _ = worker_task.await;
            }
        };

        if timeout(self.shutdown_timeout, drain).await.is_err() {
            warn!(
                timeout = ?self.shutdown_timeout,
                "graceful shutdown timed out, exiting anyway"
            );
        } else {
            info!("graceful shutdown complete");
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
