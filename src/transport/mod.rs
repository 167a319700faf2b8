pub mod frame;
pub mod shutdown;

pub use frame::{FrameError, FRAME_LEN};
pub use shutdown::ShutdownCoordinator;
