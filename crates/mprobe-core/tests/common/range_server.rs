//! Minimal HTTP/1.1 origin for integration tests.
//!
//! Serves a single static body with HEAD and Range GET, plus optional
//! redirects, and records every request it receives.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// If false, HEAD returns 405 (simulates servers that block HEAD).
    pub head_allowed: bool,
    /// If false, GET ignores Range and always returns 200 with the full body
    /// (still carrying a `Content-Range` header).
    pub support_ranges: bool,
    /// If false, HEAD responses carry no `Content-Length`.
    pub head_length: bool,
    /// Paths whose HEAD responses carry no `Content-Length` even if `head_length` is set.
    pub no_head_length: &'static [&'static str],
    pub content_type: Option<&'static str>,
    pub content_disposition: Option<&'static str>,
    /// `(path, location)` pairs answered with `302 Found`.
    pub redirects: &'static [(&'static str, &'static str)],
    /// Pause before answering each GET (a slow origin).
    pub get_delay_ms: u64,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            head_allowed: true,
            support_ranges: true,
            head_length: true,
            no_head_length: &[],
            content_type: None,
            content_disposition: None,
            redirects: &[],
            get_delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedRequest {
    pub method: String,
    pub path: String,
    pub range: Option<(u64, u64)>,
}

pub struct RangeServer {
    /// e.g. "http://127.0.0.1:12345/"
    pub base: String,
    log: Arc<Mutex<Vec<LoggedRequest>>>,
}

impl RangeServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    pub fn requests(&self) -> Vec<LoggedRequest> {
        self.log.lock().unwrap().clone()
    }

    /// `(start, end_inclusive)` of every ranged GET, in arrival order.
    pub fn get_ranges(&self) -> Vec<(u64, u64)> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "GET")
            .filter_map(|r| r.range)
            .collect()
    }
}

/// Starts a server in a background thread serving `body`. It runs until the process exits.
pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let log = Arc::new(Mutex::new(Vec::new()));
    let server_log = Arc::clone(&log);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let log = Arc::clone(&server_log);
            thread::spawn(move || handle(stream, &body, opts, &log));
        }
    });
    RangeServer {
        base: format!("http://127.0.0.1:{}/", port),
        log,
    }
}

fn entity_headers(opts: &RangeServerOptions) -> String {
    let mut out = String::new();
    if let Some(ct) = opts.content_type {
        out.push_str(&format!("Content-Type: {}\r\n", ct));
    }
    if let Some(cd) = opts.content_disposition {
        out.push_str(&format!("Content-Disposition: {}\r\n", cd));
    }
    if opts.support_ranges {
        out.push_str("Accept-Ranges: bytes\r\n");
    }
    out.push_str("ETag: \"v1\"\r\nConnection: close\r\n");
    out
}

fn handle(
    mut stream: std::net::TcpStream,
    body: &[u8],
    opts: RangeServerOptions,
    log: &Mutex<Vec<LoggedRequest>>,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let parsed = parse_request(request);
    log.lock().unwrap().push(parsed.clone());

    if let Some((_, location)) = opts.redirects.iter().find(|(p, _)| *p == parsed.path) {
        let response = format!(
            "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            location
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    let total = body.len() as u64;
    if parsed.method.eq_ignore_ascii_case("HEAD") {
        if !opts.head_allowed {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
            return;
        }
        let length = if opts.head_length && !opts.no_head_length.contains(&parsed.path.as_str()) {
            format!("Content-Length: {}\r\n", total)
        } else {
            String::new()
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\n{}{}\r\n",
            length,
            entity_headers(&opts)
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }
    if parsed.method.eq_ignore_ascii_case("GET") {
        if opts.get_delay_ms > 0 {
            thread::sleep(std::time::Duration::from_millis(opts.get_delay_ms));
        }
        let full = (
            "200 OK",
            format!("bytes 0-{}/{}", total.saturating_sub(1), total),
            body,
        );
        let (status, range_header, slice) = match parsed.range {
            Some((start, end_incl)) if opts.support_ranges => {
                let end_incl = end_incl.min(total.saturating_sub(1));
                if start >= total || start > end_incl {
                    (
                        "416 Range Not Satisfiable",
                        format!("bytes */{}", total),
                        &body[0..0],
                    )
                } else {
                    let start = start as usize;
                    let end_excl = (end_incl + 1) as usize;
                    (
                        "206 Partial Content",
                        format!("bytes {}-{}/{}", start, end_excl - 1, total),
                        &body[start..end_excl],
                    )
                }
            }
            _ => full,
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Range: {}\r\n{}\r\n",
            status,
            slice.len(),
            range_header,
            entity_headers(&opts)
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.write_all(slice);
        return;
    }
    let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
}

/// Method, path and optional `(start, end_inclusive)` of `Range: bytes=X-Y`.
fn parse_request(request: &str) -> LoggedRequest {
    let mut lines = request.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("").to_string();
    let path = first.next().unwrap_or("/").to_string();
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if let Some(part) = value.strip_prefix("bytes=") {
                    if let Some((a, b)) = part.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    LoggedRequest {
        method,
        path,
        range,
    }
}
