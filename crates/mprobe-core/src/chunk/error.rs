//! Chunk fetch error type.

/// Error returned by a single ranged fetch. Fatal to the analysis run that issued it.
#[derive(Debug, thiserror::Error)]
pub enum ChunkFetchError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("transfer failed: {0}")]
    Curl(#[from] curl::Error),
    /// HTTP response status outside {200, 206}.
    #[error("HTTP {0}")]
    Http(u32),
    /// Origin answered a non-zero offset with the whole file.
    #[error("origin ignored range request at offset {offset}")]
    RangeIgnored { offset: u64 },
    /// The blocking transfer task panicked or was cancelled.
    #[error("fetch task failed: {0}")]
    Task(String),
}
