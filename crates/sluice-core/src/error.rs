//! Relay errors — which side failed, and why.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The source failed. Nothing was written after the failure.
    #[error("source failed: {0}")]
    Source(#[source] io::Error),
    /// The sink failed. The source was not pulled again.
    #[error("sink failed: {0}")]
    Sink(#[source] io::Error),
    /// Abandoned by the caller before end of data.
    #[error("relay cancelled after {bytes} bytes")]
    Cancelled { bytes: u64 },
}

impl RelayError {
    /// The underlying I/O error, if one side failed.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            RelayError::Source(e) | RelayError::Sink(e) => Some(e),
            RelayError::Cancelled { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RelayError::Cancelled { .. })
    }
}
