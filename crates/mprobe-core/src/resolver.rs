//! Resource resolution: canonical URL, size, type and filename of a remote file.
//!
//! Probes run in tiers and each tier only runs if the previous ones left the
//! size or type unknown:
//! 1. HEAD, following redirects hop by hop; the last hop's URL becomes
//!    canonical, so its response is the HEAD at the canonical URL,
//! 2. GET `bytes=0-0` at the canonical URL, whose `Content-Range` total is
//!    authoritative.
//!
//! Redirects are followed here rather than by curl, and every hop is checked
//! against the [`TargetPolicy`] before it is requested. Network failures fall
//! through to the next tier; exhausting all tiers yields a descriptor with
//! unknown size and empty type rather than an error.

use crate::config::HttpConfig;
use crate::context::RequestContext;
use crate::fetch_head::{self, HeadResult, ProbeKind};
use crate::target::{TargetPolicy, UnsafeTargetError};
use crate::url_model;
use serde::Serialize;
use url::Url;
use tracing::Instrument;

/// What the resolver learned about a remote resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    pub canonical_url: String,
    pub filename: String,
    /// `None` if the origin never disclosed the size.
    pub total_size: Option<u64>,
    /// Empty if neither the origin nor the filename extension told us.
    pub content_type: String,
}

/// Every probe tier failed to produce size or type. Logged, never returned.
#[derive(Debug, thiserror::Error)]
#[error("metadata probe exhausted all tiers for {url}")]
pub struct ResolutionError {
    pub url: String,
}

#[derive(Debug, Default)]
struct Findings {
    size: Option<u64>,
    content_type: Option<String>,
    disposition: Option<String>,
}

impl Findings {
    fn complete(&self) -> bool {
        self.size.is_some() && self.content_type.is_some()
    }

    /// Fill in whatever is still missing from `head`.
    fn absorb(&mut self, head: &HeadResult) {
        if !head.is_success() {
            return;
        }
        if self.size.is_none() {
            self.size = head.content_range_total.or(head.content_length);
        }
        if self.content_type.is_none() {
            self.content_type = head.content_type.clone();
        }
        if self.disposition.is_none() {
            self.disposition = head.content_disposition.clone();
        }
    }
}

/// Resolves metadata for `url`.
///
/// Fails only when `url` (or where its redirects lead) is not an allowed target.
pub async fn resolve(
    url: &str,
    policy: &TargetPolicy,
    http: &HttpConfig,
    ctx: &RequestContext,
) -> Result<ResourceDescriptor, UnsafeTargetError> {
    let parsed = policy.check(url)?;
    let start = url_model::rewrite_share_link(&parsed).unwrap_or(parsed);
    policy.check_url(&start)?;
    let original = start.to_string();
    let policy = *policy;
    let http = http.clone();

    let span = ctx.span("resolve");
    tokio::task::spawn_blocking(move || resolve_blocking(&original, &policy, &http))
        .instrument(span)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("resolver task failed: {}", e);
            Ok(ResourceDescriptor {
                canonical_url: url.to_string(),
                filename: url_model::derive_filename(url, url, None),
                total_size: None,
                content_type: String::new(),
            })
        })
}

/// Where a redirect chain ended and the last response seen.
struct Chain {
    url: Url,
    head: Option<HeadResult>,
}

/// Sends `kind` to `start`, following up to `http.max_redirects` redirects.
///
/// Each `Location` is resolved against the current URL and must pass `policy`
/// before it is requested. A transport failure ends the chain at the URL that
/// failed, with no response.
fn follow_chain(
    start: Url,
    kind: ProbeKind,
    policy: &TargetPolicy,
    http: &HttpConfig,
) -> Result<Chain, UnsafeTargetError> {
    let mut url = start;
    for hop in 0..=http.max_redirects {
        let head = match fetch_head::probe(url.as_str(), kind, http) {
            Ok(head) => head,
            Err(e) => {
                tracing::debug!("{:?} {} failed: {:#}", kind, url, e);
                return Ok(Chain { url, head: None });
            }
        };
        let next = match head.redirect_location().map(|l| url.join(l)) {
            Some(Ok(next)) => next,
            Some(Err(e)) => {
                tracing::debug!("bad redirect from {}: {}", url, e);
                return Ok(Chain { url, head: None });
            }
            None => return Ok(Chain { url, head: Some(head) }),
        };
        if let Err(e) = policy.check_url(&next) {
            tracing::warn!("redirect from {} to {} rejected: {}", url, next, e);
            return Err(e);
        }
        tracing::debug!("redirect {}: {} -> {}", hop + 1, url, next);
        url = next;
    }
    tracing::debug!("too many redirects, stopped at {}", url);
    Ok(Chain { url, head: None })
}

/// Synchronous tiered probe. Runs on a blocking thread.
pub fn resolve_blocking(
    url: &str,
    policy: &TargetPolicy,
    http: &HttpConfig,
) -> Result<ResourceDescriptor, UnsafeTargetError> {
    let start = policy.check(url)?;
    let mut found = Findings::default();

    let chain = follow_chain(start, ProbeKind::Head, policy, http)?;
    if let Some(head) = &chain.head {
        found.absorb(head);
    }
    let mut canonical = chain.url;

    if !found.complete() {
        let chain = follow_chain(canonical.clone(), ProbeKind::FirstByte, policy, http)?;
        if let Some(head) = &chain.head {
            // A ranged reply's total beats any Content-Length guessed above.
            if head.is_success() {
                if let Some(total) = head.content_range_total {
                    found.size = Some(total);
                }
            }
            found.absorb(head);
        }
        canonical = chain.url;
    }
    let canonical = canonical.to_string();

    if found.size.is_none() && found.content_type.is_none() {
        let err = ResolutionError {
            url: url.to_string(),
        };
        tracing::warn!("{}", err);
    }

    let filename = url_model::derive_filename(&canonical, url, found.disposition.as_deref());
    let content_type = found
        .content_type
        .filter(|t| !t.is_empty())
        .or_else(|| url_model::mime_from_filename(&filename).map(str::to_string))
        .unwrap_or_default();

    Ok(ResourceDescriptor {
        canonical_url: canonical,
        filename,
        total_size: found.size,
        content_type,
    })
}
