pub mod acceptor;
pub mod handler;
pub mod supervisor;

pub use acceptor::{AcceptorError, ConnectionAcceptor, ShutdownError};
pub use handler::{ConnectionError, ConnectionHandler};
pub use supervisor::ServiceSupervisor;
