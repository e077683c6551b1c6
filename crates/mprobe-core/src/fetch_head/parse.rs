//! Parse HTTP response header lines into HeadResult.

use super::HeadResult;

/// Parse collected header lines into HeadResult.
///
/// Interim `1xx` blocks come before the real response; a new status line
/// discards what was collected so only the last response is described.
pub(crate) fn parse_headers(lines: &[String]) -> HeadResult {
    let mut r = HeadResult::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            r = HeadResult {
                status: parse_status_line(line).unwrap_or(0),
                ..HeadResult::default()
            };
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.parse::<u64>() {
                    r.content_length = Some(n);
                }
            } else if name.eq_ignore_ascii_case("content-type") {
                let media = value.split(';').next().unwrap_or("").trim();
                if !media.is_empty() {
                    r.content_type = Some(media.to_ascii_lowercase());
                }
            } else if name.eq_ignore_ascii_case("content-range") {
                r.content_range_total = parse_content_range_total(value);
            } else if name.eq_ignore_ascii_case("content-disposition") {
                r.content_disposition = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("location") {
                r.location = Some(value.to_string());
            }
        }
    }

    r
}

/// `HTTP/1.1 206 Partial Content` -> 206.
pub(crate) fn parse_status_line(line: &str) -> Option<u32> {
    line.split_whitespace().nth(1)?.parse().ok()
}

/// Total length from `bytes 0-0/12345` or `bytes */12345`; `None` for `/*`.
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.trim().parse::<u64>().ok()
}
