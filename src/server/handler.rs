use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tracing::debug;

use crate::state::NumberSet;
use crate::transport::frame::{self, FrameError};

const DEFAULT_HANDLE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(thiserror::Error, Debug)]
pub enum ConnectionError {
    #[error("read frame: {0}")]
    Read(#[source] FrameError),
    #[error("write response: {0}")]
    Write(#[source] std::io::Error),
    #[error("handling number timed out after {0:?}")]
    Timeout(Duration),
}

/// Per-connection loop: read one number, update the shared set, write
/// back the new aggregate, until the client closes the stream.
///
/// Every error is local to the connection it happened on; the caller
/// logs it and drops the stream, nothing else is affected.
pub struct ConnectionHandler {
    numbers: Arc<NumberSet>,
    handle_timeout: Duration,
}

impl ConnectionHandler {
    pub fn new(numbers: Arc<NumberSet>) -> Self {
        Self {
            numbers,
            handle_timeout: DEFAULT_HANDLE_TIMEOUT,
        }
    }

    /// Bounds the shared-state step for a single number, so a stalled
    /// lock cannot hang the connection forever.
    pub fn with_handle_timeout(mut self, handle_timeout: Duration) -> Self {
        self.handle_timeout = handle_timeout;
        self
    }

    pub async fn handle<S>(&self, mut stream: S) -> Result<(), ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let number = match frame::read_number(&mut stream).await {
                Ok(Some(number)) => number,
                Ok(None) => return Ok(()),
                Err(err) => return Err(ConnectionError::Read(err)),
            };

            let sum_of_squares = timeout(
                self.handle_timeout,
                self.numbers.insert_and_aggregate(number),
            )
            .await
            .map_err(|_| ConnectionError::Timeout(self.handle_timeout))?;

            debug!(number, sum_of_squares, "handled number");

            frame::write_number(&mut stream, sum_of_squares)
                .await
                .map_err(ConnectionError::Write)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::frame::encode;

    #[tokio::test]
    async fn responds_with_running_aggregate() {
        let numbers = Arc::new(NumberSet::new());
        let handler = ConnectionHandler::new(numbers);

        let stream = tokio_test::io::Builder::new()
            .read(&encode(3))
            .write(&encode(9))
            .read(&encode(4))
            .write(&encode(25))
            .read(&encode(3))
            .write(&encode(25))
            .build();

        handler.handle(stream).await.unwrap();
    }

    #[tokio::test]
    async fn malformed_frame_is_a_protocol_error() {
        let numbers = Arc::new(NumberSet::new());
        let handler = ConnectionHandler::new(numbers.clone());

        let stream = tokio_test::io::Builder::new().read(&[0xff; 10]).build();

        let err = handler.handle(stream).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Read(FrameError::Overflow)));
        assert!(numbers.is_empty().await);
    }

    #[tokio::test]
    async fn stalled_shared_state_times_out_the_connection() {
        let numbers = Arc::new(NumberSet::new());
        let handler = ConnectionHandler::new(Arc::clone(&numbers))
            .with_handle_timeout(Duration::from_millis(20));

        // hold the set's lock so the insert can never run
        let guard = numbers.lock().await;

        let stream = tokio_test::io::Builder::new().read(&encode(5)).build();
        let err = handler.handle(stream).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Timeout(_)));

        drop(guard);
        assert!(numbers.is_empty().await);
    }

    #[tokio::test]
    async fn truncated_frame_is_a_protocol_error() {
        let numbers = Arc::new(NumberSet::new());
        let handler = ConnectionHandler::new(numbers);

        let stream = tokio_test::io::Builder::new().read(&encode(7)[..3]).build();

        let err = handler.handle(stream).await.unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::Read(FrameError::Truncated { got: 3 })
        ));
    }
}
