use std::io;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to launch producer {path:?}")]
    Launch {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("producer was started without a readable stdout")]
    StdoutUnavailable,

    #[error("invalid frame geometry {height}x{width}")]
    InvalidGeometry { height: usize, width: usize },

    #[error("expected {expected} bytes for a frame, got {actual}")]
    Decode { expected: usize, actual: usize },

    #[error("producer closed its output stream")]
    StreamEnd,

    #[error("no frame after {waited:?} ({buffered} bytes buffered)")]
    Timeout { waited: Duration, buffered: usize },

    #[error("interrupted")]
    Cancelled,

    #[error("giving up after {count} consecutive failed reads")]
    TooManyFailures { count: u32 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ReaderError {
    /// Failures the stream loop may retry after.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ReaderError::Decode { .. } | ReaderError::Timeout { .. })
    }
}
