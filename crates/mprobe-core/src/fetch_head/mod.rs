//! HTTP metadata probing.
//!
//! Uses the curl crate (libcurl) to fetch response headers of a HEAD or a
//! one-byte ranged GET and extract `Content-Length`, `Content-Type`,
//! `Content-Range` and `Content-Disposition`.

mod parse;

pub use parse::parse_content_range_total;
pub(crate) use parse::parse_status_line;

use crate::config::HttpConfig;
use crate::http::{self, Deadline};
use anyhow::{Context, Result};
use std::str;

/// Metadata extracted from the final response of a probe.
#[derive(Debug, Clone, Default)]
pub struct HeadResult {
    /// HTTP status of the final response (0 if no status line was seen).
    pub status: u32,
    pub content_length: Option<u64>,
    /// Media type without parameters, lowercased.
    pub content_type: Option<String>,
    /// Total size announced by `Content-Range`.
    pub content_range_total: Option<u64>,
    pub content_disposition: Option<String>,
    pub location: Option<String>,
}

impl HeadResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `Location` of a 3xx response, if any.
    pub fn redirect_location(&self) -> Option<&str> {
        if (300..400).contains(&self.status) {
            self.location.as_deref()
        } else {
            None
        }
    }
}

/// Request shape for a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// Plain HEAD.
    Head,
    /// GET with `Range: bytes=0-0`; the body is discarded.
    FirstByte,
}

/// Performs a single probe request and returns parsed response metadata.
///
/// Redirects are never followed here: a 3xx comes back with its `location`
/// so the caller can validate the next hop before contacting it.
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub fn probe(url: &str, kind: ProbeKind, http: &HttpConfig) -> Result<HeadResult> {
    let mut headers: Vec<String> = Vec::new();

    let extra = match kind {
        ProbeKind::Head => Vec::new(),
        ProbeKind::FirstByte => vec![("Range", http::range_header_value(0, 1))],
    };
    let mut easy = http::new_easy(url, http, Deadline::Bounded, &extra).context("invalid URL")?;
    if kind == ProbeKind::Head {
        easy.nobody(true)?;
    }
    easy.follow_location(false)?;

    // Origins that ignore the range would otherwise stream the whole file.
    let mut body_seen = 0usize;
    let mut cut_short = false;
    let outcome = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                headers.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.write_function(|data| {
            body_seen += data.len();
            if body_seen > 1 {
                cut_short = true;
                return Ok(0);
            }
            Ok(data.len())
        })?;
        transfer.perform()
    };
    if let Err(e) = outcome {
        if !(cut_short && e.is_write_error()) {
            return Err(e).context("probe request failed");
        }
    }

    Ok(parse::parse_headers(&headers))
}
