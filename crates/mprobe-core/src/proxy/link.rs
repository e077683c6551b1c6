//! Building and decoding `/p/<target>/<filename>` links.

use super::error::BadLinkError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Unreserved characters stay; everything else in a path segment is encoded.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Link that streams `url` through the proxy mounted at `base`, served as `filename`.
///
/// The target is base64 (standard alphabet) and then percent-encoded once.
pub fn proxy_link(base: &str, url: &str, filename: &str) -> String {
    let target = STANDARD.encode(url.as_bytes());
    format!(
        "{}/p/{}/{}",
        base.trim_end_matches('/'),
        utf8_percent_encode(&target, SEGMENT),
        utf8_percent_encode(filename, SEGMENT)
    )
}

/// Recovers the target URL from a `/p/` path segment.
///
/// Accepts the segment with or without its percent-encoding already removed.
pub fn decode_target(segment: &str) -> Result<String, BadLinkError> {
    let decoded;
    let b64 = if segment.contains('%') {
        decoded = percent_decode_str(segment)
            .decode_utf8()
            .map_err(|_| BadLinkError)?;
        &*decoded
    } else {
        segment
    };
    let bytes = STANDARD.decode(b64.trim()).map_err(|_| BadLinkError)?;
    String::from_utf8(bytes).map_err(|_| BadLinkError)
}
