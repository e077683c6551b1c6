//! The capability set the driver needs from an analysis engine.

use std::sync::Arc;

/// Result of submitting one chunk to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// Wants the bytes that follow the chunk just submitted.
    NeedMore,
    /// Wants to continue elsewhere; read the target with `seek_words`.
    SeekRequested,
    /// Has everything it needs.
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("unsupported option {0}")]
    UnknownOption(String),
    #[error("invalid value {value:?} for option {name}")]
    InvalidOption { name: String, value: String },
    #[error("core used before open")]
    NotOpen,
    #[error("core already disposed")]
    Disposed,
    #[error("malformed media data: {0}")]
    Malformed(String),
}

/// An incremental media analysis engine.
///
/// The driver calls `open` once, then alternates `feed` with `seek_words` and
/// `reposition` as the engine directs, and finally `finalize` and `inform`.
/// `dispose` releases engine resources; the driver never reuses a disposed core.
pub trait AnalysisCore: Send {
    fn set_option(&mut self, name: &str, value: &str) -> Result<(), CoreError>;

    /// Prepares to receive data for a file of `total_size` bytes starting at `offset`.
    fn open(&mut self, total_size: Option<u64>, offset: u64) -> Result<(), CoreError>;

    /// Submits the bytes located at the current buffer cursor.
    fn feed(&mut self, data: &[u8]) -> Result<FeedStatus, CoreError>;

    /// Requested seek target as `(low, high)` 32-bit words; `(-1, -1)` if none.
    fn seek_words(&self) -> (i32, i32);

    /// Moves the buffer cursor to `offset`; the next `feed` carries data from there.
    fn reposition(&mut self, offset: u64) -> Result<(), CoreError>;

    fn finalize(&mut self) -> Result<(), CoreError>;

    /// Renders the report in the format selected by the `output` option.
    fn inform(&self) -> Result<String, CoreError>;

    fn dispose(&mut self);
}

/// Creates fresh core instances for the driver.
pub trait CoreFactory: Send + Sync {
    fn create(&self) -> Box<dyn AnalysisCore>;
}

impl<F> CoreFactory for F
where
    F: Fn() -> Box<dyn AnalysisCore> + Send + Sync,
{
    fn create(&self) -> Box<dyn AnalysisCore> {
        self()
    }
}

pub type SharedCoreFactory = Arc<dyn CoreFactory>;
