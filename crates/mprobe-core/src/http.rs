//! Shared libcurl setup: browser-emulating headers and transport timeouts.
//!
//! Origins behind CDNs and file hosts often refuse clients that do not look
//! like a browser, so the resolver, chunk provider and proxy all send the same
//! header set.

use crate::config::HttpConfig;
use std::time::Duration;

pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Headers sent with every origin request (besides `User-Agent` and `Range`).
pub const BROWSER_HEADERS: &[(&str, &str)] = &[
    ("Accept", "*/*"),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Sec-Fetch-Dest", "video"),
    ("Sec-Fetch-Mode", "no-cors"),
    ("Connection", "keep-alive"),
];

/// How long the transfer may run in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Bounded probe or chunk fetch: apply `HttpConfig::timeout_secs`.
    Bounded,
    /// Long-running relay: only the low-speed abort applies.
    Streaming,
}

/// Creates a curl handle for `url` with timeouts and browser headers applied.
///
/// `extra` headers (e.g. `Range`) are appended after the browser set. Redirects
/// are not followed unless the caller enables them.
pub fn new_easy(
    url: &str,
    http: &HttpConfig,
    deadline: Deadline,
    extra: &[(&str, String)],
) -> Result<curl::easy::Easy, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.useragent(USER_AGENT)?;
    easy.connect_timeout(Duration::from_secs(http.connect_timeout_secs))?;
    easy.low_speed_limit(http.low_speed_limit)?;
    easy.low_speed_time(Duration::from_secs(http.low_speed_time_secs))?;
    if deadline == Deadline::Bounded {
        easy.timeout(Duration::from_secs(http.timeout_secs))?;
    }

    if !http.resolve.is_empty() {
        let mut pins = curl::easy::List::new();
        for pin in &http.resolve {
            pins.append(pin)?;
        }
        easy.resolve(pins)?;
    }

    let mut list = curl::easy::List::new();
    for (k, v) in BROWSER_HEADERS {
        list.append(&format!("{}: {}", k, v))?;
    }
    for (k, v) in extra {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    easy.http_headers(list)?;
    Ok(easy)
}

/// `bytes=<start>-<end_inclusive>` for a half-open range `[offset, offset + len)`.
pub fn range_header_value(offset: u64, len: u64) -> String {
    format!("bytes={}-{}", offset, offset + len.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_header_is_inclusive() {
        assert_eq!(range_header_value(0, 1), "bytes=0-0");
        assert_eq!(range_header_value(100, 262_144), "bytes=100-262243");
    }
}
