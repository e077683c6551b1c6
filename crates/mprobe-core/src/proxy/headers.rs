//! Response header rewriting for proxied downloads.

use crate::url_model::{format_content_disposition, mime_from_filename, DispositionKind};

/// Value of the `X-Proxy-Service` header.
pub const PROXY_SERVICE: &str = "mprobe";

pub const PROXY_CACHE_CONTROL: &str = "public, max-age=0, must-revalidate";

/// CORS headers sent on every proxy response, including preflight.
pub const CORS_HEADERS: &[(&str, &str)] = &[
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, HEAD, OPTIONS"),
    ("Access-Control-Allow-Headers", "Range, If-Range, Content-Type"),
    (
        "Access-Control-Expose-Headers",
        "Content-Length, Content-Range, Content-Disposition, Accept-Ranges, X-Proxy-Service",
    ),
];

/// Upstream headers relayed as-is: (lowercase name, canonical name).
const PASSTHROUGH: &[(&str, &str)] = &[
    ("content-type", "Content-Type"),
    ("content-length", "Content-Length"),
    ("content-range", "Content-Range"),
    ("etag", "ETag"),
    ("last-modified", "Last-Modified"),
];

/// Status and headers of the origin response that will be relayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamHead {
    pub status: u16,
    /// Names lowercased, in arrival order.
    pub headers: Vec<(String, String)>,
}

impl UpstreamHead {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Headers every proxy response carries regardless of the origin.
fn fixed_headers() -> Vec<(&'static str, String)> {
    let mut out: Vec<(&'static str, String)> = CORS_HEADERS
        .iter()
        .map(|(k, v)| (*k, v.to_string()))
        .collect();
    out.push(("X-Proxy-Service", PROXY_SERVICE.to_string()));
    out.push(("Cache-Control", PROXY_CACHE_CONTROL.to_string()));
    out
}

/// Headers of a response with no origin behind it (CORS preflight).
pub fn service_headers() -> Vec<(&'static str, String)> {
    let mut out = fixed_headers();
    out.push(("Accept-Ranges", "bytes".to_string()));
    out
}

/// Status and headers sent to the client for `upstream`.
///
/// A plain 200 that carries `Content-Range` becomes 206 when the client asked
/// for a range, since some origins answer partial requests with 200. The
/// origin's `Accept-Ranges` is kept; `bytes` is sent when it has none.
pub fn rewrite(
    upstream: &UpstreamHead,
    client_range: bool,
    filename: &str,
) -> (u16, Vec<(&'static str, String)>) {
    let status = if upstream.status == 200 && client_range && upstream.get("content-range").is_some()
    {
        206
    } else {
        upstream.status
    };

    let mut out = fixed_headers();
    let accept_ranges = upstream.get("accept-ranges").unwrap_or("bytes");
    out.push(("Accept-Ranges", accept_ranges.to_string()));
    for (lower, canonical) in PASSTHROUGH {
        if let Some(v) = upstream.get(lower) {
            out.push((*canonical, v.to_string()));
        }
    }
    if upstream.get("content-type").is_none() {
        if let Some(mime) = mime_from_filename(filename) {
            out.push(("Content-Type", mime.to_string()));
        }
    }
    let kind = if client_range {
        DispositionKind::Inline
    } else {
        DispositionKind::Attachment
    };
    out.push((
        "Content-Disposition",
        format_content_disposition(kind, filename),
    ));
    (status, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(status: u16, headers: &[(&str, &str)]) -> UpstreamHead {
        UpstreamHead {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn value<'a>(headers: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn ranged_200_with_content_range_becomes_206() {
        let up = head(200, &[("content-range", "bytes 0-99/1000")]);
        assert_eq!(rewrite(&up, true, "a.mp4").0, 206);
        assert_eq!(rewrite(&up, false, "a.mp4").0, 200);
        assert_eq!(rewrite(&head(200, &[]), true, "a.mp4").0, 200);
        assert_eq!(rewrite(&head(404, &[]), true, "a.mp4").0, 404);
    }

    #[test]
    fn disposition_follows_client_range() {
        let (_, h) = rewrite(&head(206, &[]), true, "My \"Video\".mp4");
        assert_eq!(
            value(&h, "Content-Disposition"),
            Some("inline; filename=\"My \\\"Video\\\".mp4\"; filename*=UTF-8''My%20%22Video%22.mp4")
        );
        let (_, h) = rewrite(&head(200, &[]), false, "clip.mp4");
        assert!(value(&h, "Content-Disposition")
            .unwrap()
            .starts_with("attachment;"));
    }

    #[test]
    fn passthrough_and_service_headers() {
        let up = head(
            206,
            &[
                ("content-type", "video/mp4"),
                ("content-length", "100"),
                ("content-range", "bytes 0-99/1000"),
                ("etag", "\"abc\""),
                ("set-cookie", "secret=1"),
            ],
        );
        let (_, h) = rewrite(&up, true, "a.mp4");
        assert_eq!(value(&h, "Content-Type"), Some("video/mp4"));
        assert_eq!(value(&h, "Content-Length"), Some("100"));
        assert_eq!(value(&h, "ETag"), Some("\"abc\""));
        assert_eq!(value(&h, "Accept-Ranges"), Some("bytes"));
        assert_eq!(value(&h, "X-Proxy-Service"), Some("mprobe"));
        assert_eq!(value(&h, "Access-Control-Allow-Origin"), Some("*"));
        assert_eq!(value(&h, "Cache-Control"), Some(PROXY_CACHE_CONTROL));
        assert!(h.iter().all(|(k, _)| !k.eq_ignore_ascii_case("set-cookie")));
    }

    #[test]
    fn origin_accept_ranges_is_kept() {
        let (_, h) = rewrite(&head(200, &[("accept-ranges", "none")]), false, "a.mp4");
        assert_eq!(value(&h, "Accept-Ranges"), Some("none"));
        assert_eq!(h.iter().filter(|(k, _)| *k == "Accept-Ranges").count(), 1);

        let (_, h) = rewrite(&head(200, &[]), false, "a.mp4");
        assert_eq!(value(&h, "Accept-Ranges"), Some("bytes"));
        assert_eq!(value(&service_headers(), "Accept-Ranges"), Some("bytes"));
    }

    #[test]
    fn missing_type_guessed_from_filename() {
        let (_, h) = rewrite(&head(200, &[]), false, "song.mp3");
        assert_eq!(value(&h, "Content-Type"), Some("audio/mpeg"));
    }
}
