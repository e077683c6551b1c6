//! Ranged chunk fetching for the analysis feed loop.
//!
//! [`RangedChunkProvider`] issues one `Range` GET per request against the
//! resolved canonical URL and never asks for bytes past a known total size.

mod error;

pub use error::ChunkFetchError;

use crate::config::HttpConfig;
use crate::fetch_head::parse_status_line;
use crate::http::{self, Deadline};
use async_trait::async_trait;
use bytes::Bytes;
use std::cell::Cell;
use std::str;

/// One byte range requested by the feed loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRequest {
    pub offset: u64,
    pub size: u32,
}

impl ChunkRequest {
    /// Clamps `size` so the request ends at or before `total` (when known).
    /// Returns `None` if nothing is left to fetch.
    pub fn bounded(offset: u64, size: u32, total: Option<u64>) -> Option<Self> {
        let size = match total {
            Some(total) => {
                let remaining = total.saturating_sub(offset);
                u64::from(size).min(remaining) as u32
            }
            None => size,
        };
        if size == 0 {
            return None;
        }
        Some(Self { offset, size })
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.offset + u64::from(self.size)
    }
}

/// Source of bytes for the analysis driver.
///
/// Returns fewer bytes than requested only at end-of-stream and an empty
/// buffer once the source is exhausted.
#[async_trait]
pub trait ChunkSource: Send + Sync {
    async fn fetch(&self, offset: u64, size: u32) -> Result<Bytes, ChunkFetchError>;

    /// Total length, if known.
    fn total_size(&self) -> Option<u64>;
}

/// Fetches byte ranges of one resolved URL over HTTP.
#[derive(Debug, Clone)]
pub struct RangedChunkProvider {
    url: String,
    total_size: Option<u64>,
    chunk_cap: u32,
    http: HttpConfig,
}

impl RangedChunkProvider {
    /// `url` must already be validated and resolved to its canonical form.
    pub fn new(url: String, total_size: Option<u64>, chunk_cap: u32, http: HttpConfig) -> Self {
        Self {
            url,
            total_size,
            chunk_cap: chunk_cap.max(1),
            http,
        }
    }

    /// Blocking ranged GET; call from `spawn_blocking` if used from async code.
    pub fn fetch_blocking(&self, offset: u64, size: u32) -> Result<Bytes, ChunkFetchError> {
        let req = match ChunkRequest::bounded(offset, size.min(self.chunk_cap), self.total_size) {
            Some(req) => req,
            None => return Ok(Bytes::new()),
        };
        fetch_range(&self.url, &self.http, req)
    }
}

#[async_trait]
impl ChunkSource for RangedChunkProvider {
    async fn fetch(&self, offset: u64, size: u32) -> Result<Bytes, ChunkFetchError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.fetch_blocking(offset, size))
            .await
            .map_err(|e| ChunkFetchError::Task(e.to_string()))?
    }

    fn total_size(&self) -> Option<u64> {
        self.total_size
    }
}

/// GET `req` from `url`, keeping at most `req.size` bytes.
fn fetch_range(url: &str, http_cfg: &HttpConfig, req: ChunkRequest) -> Result<Bytes, ChunkFetchError> {
    let range = http::range_header_value(req.offset, u64::from(req.size));
    let mut easy = http::new_easy(url, http_cfg, Deadline::Bounded, &[("Range", range)])?;

    let limit = req.size as usize;
    let mut body: Vec<u8> = Vec::with_capacity(limit.min(1 << 20));
    let status = Cell::new(0u32);
    let mut truncated = false;
    let outcome = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(line) = str::from_utf8(data) {
                if line.starts_with("HTTP/") {
                    status.set(parse_status_line(line).unwrap_or(0));
                }
            }
            true
        })?;
        transfer.write_function(|data| {
            // A 200 means the origin ignored the range; only offset 0 is usable.
            if status.get() == 200 && req.offset > 0 {
                truncated = true;
                return Ok(0);
            }
            let room = limit - body.len();
            if data.len() > room {
                body.extend_from_slice(&data[..room]);
                truncated = true;
                return Ok(0);
            }
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()
    };
    if let Err(e) = outcome {
        if !(truncated && e.is_write_error()) {
            return Err(ChunkFetchError::Curl(e));
        }
    }

    let code = easy.response_code()?;
    match code {
        206 => Ok(Bytes::from(body)),
        200 if req.offset == 0 => Ok(Bytes::from(body)),
        200 => Err(ChunkFetchError::RangeIgnored { offset: req.offset }),
        // Past the end of a resource whose size we never learned.
        416 => Ok(Bytes::new()),
        other => Err(ChunkFetchError::Http(other)),
    }
}
