use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info};

use crate::server::handler::ConnectionHandler;

// accepting -> draining -> stopped
const ACCEPTING: u8 = 0;
const DRAINING: u8 = 1;
const STOPPED: u8 = 2;

#[derive(thiserror::Error, Debug)]
pub enum AcceptorError {
    #[error("accept connection: {0}")]
    Accept(#[source] std::io::Error),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ShutdownError {
    #[error("acceptor is already shutting down")]
    AlreadyShuttingDown,
}

/// Accept loop dispatching one handler task per connection.
///
/// The acceptor tracks how many handler tasks are in flight so that
/// `shutdown` can drain them: no new connection is handled once
/// draining starts, but in-flight handlers always run to natural
/// completion. Connections arriving during the drain are still
/// accepted (the listener stays open to avoid contention) and
/// immediately dropped; once the drain completes the listener itself
/// is closed, so later connects are refused outright.
pub struct ConnectionAcceptor {
    // taken by `serve`, which owns the socket until it exits
    listener: Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,
    handler: ConnectionHandler,
    state: AtomicU8,
    active: AtomicUsize,
    drained: Notify,
    close: Notify,
    stopped: Notify,
}

impl ConnectionAcceptor {
    pub fn new(listener: TcpListener, handler: ConnectionHandler) -> std::io::Result<Self> {
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener: Mutex::new(Some(listener)),
            local_addr,
            handler,
            state: AtomicU8::new(ACCEPTING),
            active: AtomicUsize::new(0),
            drained: Notify::new(),
            close: Notify::new(),
            stopped: Notify::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections until the listener is closed by `shutdown`,
    /// which is the clean exit: `Ok(())`. A real accept failure is
    /// returned as an error and is fatal to the service. Either way
    /// the socket is dropped, and with it the bound address.
    pub async fn serve(self: Arc<Self>) -> Result<(), AcceptorError> {
        let Some(listener) = self.listener.lock().await.take() else {
            // closed before the loop ever ran
            return Ok(());
        };

        info!("accepting connections");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(err) => {
                            self.stopped.notify_one();
                            return Err(AcceptorError::Accept(err));
                        }
                    };

                    if self.state.load(Ordering::Acquire) != ACCEPTING {
                        debug!(%peer, "draining, dropping new connection");
                        continue;
                    }

                    self.active.fetch_add(1, Ordering::AcqRel);
                    let acceptor = Arc::clone(&self);
                    tokio::spawn(async move {
                        info!(%peer, "connection opened");
                        if let Err(err) = acceptor.handler.handle(stream).await {
                            error!(%peer, error = %err, "connection failed");
                        }
                        info!(%peer, "connection closed");
                        if acceptor.active.fetch_sub(1, Ordering::AcqRel) == 1 {
                            acceptor.drained.notify_waiters();
                        }
                    });
                }
                _ = self.close.notified() => {
                    drop(listener);
                    self.stopped.notify_one();
                    info!("listener closed, accept loop stopping");
                    return Ok(());
                }
            }
        }
    }

    /// Flips to draining, waits for every in-flight handler to exit,
    /// then closes the listener. Graceful only: nothing is cancelled.
    /// Returns once the socket is actually unbound. A second call
    /// fails with `AlreadyShuttingDown`.
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        if self
            .state
            .compare_exchange(ACCEPTING, DRAINING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ShutdownError::AlreadyShuttingDown);
        }

        info!(
            active = self.active.load(Ordering::Acquire),
            "draining connections"
        );
        self.wait_drained().await;

        self.close.notify_one();
        if self.listener.lock().await.take().is_none() {
            // `serve` owns the socket and drops it on its way out
            self.stopped.notified().await;
        }

        self.state.store(STOPPED, Ordering::Release);
        Ok(())
    }

    async fn wait_drained(&self) {
        loop {
            // register before checking, so a decrement between the
            // check and the await cannot be missed
            let drained = self.drained.notified();
            if self.active.load(Ordering::Acquire) == 0 {
                return;
            }
            drained.await;
        }
    }
}
