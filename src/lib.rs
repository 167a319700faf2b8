// Shared number set
pub mod state;

// Wire codec and shutdown signaling
pub mod transport;

// Accept loop, connection handling, supervision
pub mod server;

// Periodic durable snapshots
pub mod snapshot;

// One-shot client
pub mod client;

// Logging setup
pub mod logging;

pub use server::{ConnectionAcceptor, ConnectionHandler, ServiceSupervisor};
pub use snapshot::{SnapshotStore, SnapshotWorker};
pub use state::NumberSet;
pub use transport::ShutdownCoordinator;
