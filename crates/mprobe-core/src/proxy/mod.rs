//! Streaming proxy: relays a client's GET/HEAD (and its `Range`) to the origin
//! and streams the response back with rewritten headers.
//!
//! The curl transfer runs on a blocking thread and hands the response head and
//! body chunks to the async side over a bounded channel, so a slow client
//! applies backpressure to the origin download. Redirects are followed here,
//! not by curl, so every hop is checked against the [`TargetPolicy`].

mod error;
mod headers;
mod link;

pub use error::{BadLinkError, ProxyError, ProxyUpstreamError};
pub use headers::{
    rewrite, service_headers, UpstreamHead, CORS_HEADERS, PROXY_CACHE_CONTROL, PROXY_SERVICE,
};
pub use link::{decode_target, proxy_link};

use crate::config::HttpConfig;
use crate::context::RequestContext;
use crate::events::{emit, Event, EventSink};
use crate::fetch_head::parse_status_line;
use crate::http::{self, Deadline};
use crate::target::TargetPolicy;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::cell::{Cell, RefCell};
use std::io;
use tokio::sync::mpsc;
use url::Url;

/// Body chunks in flight between the transfer thread and the client.
const RELAY_CHANNEL_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMethod {
    Get,
    Head,
}

/// What the client asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub method: ProxyMethod,
    /// Client `Range` header, forwarded verbatim.
    pub range: Option<String>,
    /// Name used in `Content-Disposition`.
    pub filename: String,
}

pub type BodyStream = BoxStream<'static, Result<Bytes, io::Error>>;

pub struct ProxyResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: BodyStream,
}

/// Messages from the transfer thread.
enum Relay {
    Head(UpstreamHead),
    Data(Bytes),
    /// The transfer failed after the head was sent.
    Broken(String),
    /// The transfer failed before any head was sent.
    Failed(ProxyError),
}

/// Opens the origin response for `target` and returns it ready to stream.
///
/// Fails before any byte is relayed if the target or a redirect hop is not
/// allowed, or the origin cannot be reached.
pub async fn stream(
    target: &str,
    request: &ProxyRequest,
    policy: &TargetPolicy,
    http: &HttpConfig,
    ctx: &RequestContext,
    events: Option<EventSink>,
) -> Result<ProxyResponse, ProxyError> {
    let url = policy.check(target)?;
    let (tx, mut rx) = mpsc::channel(RELAY_CHANNEL_DEPTH);
    {
        let request = request.clone();
        let policy = *policy;
        let http = http.clone();
        let span = ctx.span("proxy");
        tokio::task::spawn_blocking(move || {
            let _enter = span.enter();
            relay(url, &request, &policy, &http, &tx);
        });
    }

    let head = match rx.recv().await {
        Some(Relay::Head(head)) => head,
        Some(Relay::Failed(e)) => {
            tracing::warn!("{} proxy for {} failed: {}", ctx, target, e);
            return Err(e);
        }
        Some(Relay::Broken(msg)) => {
            return Err(ProxyUpstreamError::Transport(msg).into());
        }
        Some(Relay::Data(_)) | None => return Err(ProxyUpstreamError::NoResponse.into()),
    };

    let client_range = request.range.is_some();
    let (status, headers) = rewrite(&head, client_range, &request.filename);
    tracing::info!(
        "{} proxy {} -> {} (upstream {}, range {:?})",
        ctx,
        target,
        status,
        head.status,
        request.range
    );
    emit(
        events.as_ref(),
        Event::ProxyStarted {
            request_id: ctx.request_id,
            status,
            ranged: client_range,
        },
    );

    let body = body_stream(BodyState {
        rx,
        request_id: ctx.request_id,
        events,
        bytes: 0,
        done: false,
    });
    Ok(ProxyResponse {
        status,
        headers,
        body,
    })
}

struct BodyState {
    rx: mpsc::Receiver<Relay>,
    request_id: u64,
    events: Option<EventSink>,
    bytes: u64,
    done: bool,
}

impl BodyState {
    fn finish(&mut self) {
        self.done = true;
        emit(
            self.events.as_ref(),
            Event::ProxyFinished {
                request_id: self.request_id,
                bytes: self.bytes,
            },
        );
    }
}

fn body_stream(state: BodyState) -> BodyStream {
    stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }
        match st.rx.recv().await {
            Some(Relay::Data(chunk)) => {
                st.bytes += chunk.len() as u64;
                Some((Ok(chunk), st))
            }
            Some(Relay::Broken(msg)) => {
                st.finish();
                Some((Err(io::Error::other(msg)), st))
            }
            Some(Relay::Head(_)) | Some(Relay::Failed(_)) | None => {
                st.finish();
                None
            }
        }
    })
    .boxed()
}

/// Outcome of one request in the redirect chain.
enum Hop {
    Done,
    Redirect(String),
}

enum Phase {
    /// Headers of the current response not complete yet.
    Pending,
    /// Redirect to this location; the body is discarded.
    Redirect(String),
    /// Head sent; body chunks are relayed.
    Relaying,
}

struct HopState {
    status: u32,
    headers: Vec<(String, String)>,
    phase: Phase,
}

/// Runs the redirect chain on the current (blocking) thread.
fn relay(
    start: Url,
    request: &ProxyRequest,
    policy: &TargetPolicy,
    http: &HttpConfig,
    tx: &mpsc::Sender<Relay>,
) {
    let mut url = start;
    for hop in 0..=http.max_redirects {
        let location = match transfer_once(&url, request, http, tx) {
            Hop::Done => return,
            Hop::Redirect(location) => location,
        };
        let next = match url.join(&location) {
            Ok(next) => next,
            Err(_) => {
                let _ = tx.blocking_send(Relay::Failed(
                    ProxyUpstreamError::BadRedirect(location).into(),
                ));
                return;
            }
        };
        if let Err(e) = policy.check_url(&next) {
            tracing::warn!("redirect from {} to {} rejected: {}", url, next, e);
            let _ = tx.blocking_send(Relay::Failed(e.into()));
            return;
        }
        tracing::debug!("redirect {}: {} -> {}", hop + 1, url, next);
        url = next;
    }
    let _ = tx.blocking_send(Relay::Failed(
        ProxyUpstreamError::TooManyRedirects(http.max_redirects).into(),
    ));
}

/// Performs one request without following redirects.
fn transfer_once(
    url: &Url,
    request: &ProxyRequest,
    http_cfg: &HttpConfig,
    tx: &mpsc::Sender<Relay>,
) -> Hop {
    let fail = |msg: String| {
        let _ = tx.blocking_send(Relay::Failed(ProxyUpstreamError::Transport(msg).into()));
        Hop::Done
    };
    let extra: Vec<(&str, String)> = request
        .range
        .iter()
        .map(|r| ("Range", r.clone()))
        .collect();
    let mut easy = match http::new_easy(url.as_str(), http_cfg, Deadline::Streaming, &extra) {
        Ok(easy) => easy,
        Err(e) => return fail(e.to_string()),
    };
    if request.method == ProxyMethod::Head {
        if let Err(e) = easy.nobody(true) {
            return fail(e.to_string());
        }
    }

    let state = RefCell::new(HopState {
        status: 0,
        headers: Vec::new(),
        phase: Phase::Pending,
    });
    let client_gone = Cell::new(false);
    let outcome = perform_hop(&mut easy, &state, &client_gone, tx);

    match (outcome, state.into_inner().phase) {
        (_, Phase::Redirect(location)) => Hop::Redirect(location),
        (Ok(()), Phase::Relaying) => Hop::Done,
        (Err(e), Phase::Relaying) => {
            if client_gone.get() {
                tracing::debug!("client went away; aborted transfer from {}", url);
            } else {
                tracing::warn!("transfer from {} broke mid-stream: {}", url, e);
                let _ = tx.blocking_send(Relay::Broken(e.to_string()));
            }
            Hop::Done
        }
        (Err(e), Phase::Pending) => fail(e.to_string()),
        (Ok(()), Phase::Pending) => {
            let _ = tx.blocking_send(Relay::Failed(ProxyUpstreamError::NoResponse.into()));
            Hop::Done
        }
    }
}

fn perform_hop(
    easy: &mut curl::easy::Easy,
    state: &RefCell<HopState>,
    client_gone: &Cell<bool>,
    tx: &mpsc::Sender<Relay>,
) -> Result<(), curl::Error> {
    let mut transfer = easy.transfer();
    transfer.header_function(|data| on_header_line(data, state, tx))?;
    transfer.write_function(|data| {
        if !matches!(state.borrow().phase, Phase::Relaying) {
            // Body of a redirect response.
            return Ok(data.len());
        }
        match tx.blocking_send(Relay::Data(Bytes::copy_from_slice(data))) {
            Ok(()) => Ok(data.len()),
            Err(_) => {
                client_gone.set(true);
                Ok(0)
            }
        }
    })?;
    transfer.perform()
}

/// Collects one header line; at the end of a final response's header block,
/// decides between redirect and relay.
fn on_header_line(data: &[u8], state: &RefCell<HopState>, tx: &mpsc::Sender<Relay>) -> bool {
    let line = String::from_utf8_lossy(data);
    let line = line.trim_end();
    let mut st = state.borrow_mut();
    if line.starts_with("HTTP/") {
        st.status = parse_status_line(line).unwrap_or(0);
        st.headers.clear();
        return true;
    }
    if !line.is_empty() {
        if let Some((name, value)) = line.split_once(':') {
            st.headers
                .push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
        return true;
    }
    // Blank line: end of a header block. Interim 1xx responses are skipped.
    if st.status < 200 {
        return true;
    }
    if (300..400).contains(&st.status) {
        let location = st
            .headers
            .iter()
            .find(|(k, _)| k == "location")
            .map(|(_, v)| v.clone());
        if let Some(location) = location {
            st.phase = Phase::Redirect(location);
            return true;
        }
    }
    st.phase = Phase::Relaying;
    let head = UpstreamHead {
        status: u16::try_from(st.status).unwrap_or(502),
        headers: std::mem::take(&mut st.headers),
    };
    drop(st);
    // A closed channel means the client is gone; returning false aborts curl.
    tx.blocking_send(Relay::Head(head)).is_ok()
}
