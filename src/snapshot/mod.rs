pub mod store;
pub mod worker;

pub use store::{SnapshotError, SnapshotStore};
pub use worker::{SnapshotWorker, WorkerError};
