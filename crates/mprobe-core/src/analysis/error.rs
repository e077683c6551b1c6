//! Analysis run errors.

use super::core_api::CoreError;
use crate::chunk::ChunkFetchError;

/// The driver already has a run in `Feeding` or `Finalizing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("an analysis is already running")]
pub struct ConcurrentAnalysisError;

/// Why a run failed.
#[derive(Debug, thiserror::Error)]
pub enum FailureCause {
    #[error(transparent)]
    Fetch(#[from] ChunkFetchError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("exceeded {0} chunk requests")]
    RequestLimit(u32),
}

/// A failed run with diagnostics for logs and events.
///
/// `Display` shows only a terse message; offsets and byte counts are fields.
#[derive(Debug)]
pub struct AnalysisFailure {
    /// Offset of the fetch or feed that failed.
    pub offset: u64,
    pub requests: u32,
    pub bytes_fetched: u64,
    pub cause: FailureCause,
}

impl std::fmt::Display for AnalysisFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            FailureCause::Fetch(_) => write!(f, "could not read the media file from its origin"),
            FailureCause::Core(_) => write!(f, "the media file could not be analyzed"),
            FailureCause::RequestLimit(_) => write!(f, "the media file requires too many reads"),
        }
    }
}

impl std::error::Error for AnalysisFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Concurrent(#[from] ConcurrentAnalysisError),
    /// The core rejected the options or could not be opened.
    #[error("analysis could not start: {0}")]
    Setup(CoreError),
    #[error(transparent)]
    Failed(#[from] AnalysisFailure),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_hides_diagnostics() {
        let f = AnalysisFailure {
            offset: 123_456,
            requests: 3,
            bytes_fetched: 999,
            cause: FailureCause::Fetch(ChunkFetchError::Http(503)),
        };
        let msg = f.to_string();
        assert!(!msg.contains("123456"));
        assert!(!msg.contains("503"));
        assert_eq!(
            std::error::Error::source(&f).map(|e| e.to_string()).as_deref(),
            Some("HTTP 503")
        );
    }
}
