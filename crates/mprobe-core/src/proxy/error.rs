//! Proxy error types.

use crate::target::UnsafeTargetError;

/// The origin could not be reached, or gave nothing usable, before response
/// headers were available. Answered with 502.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyUpstreamError {
    #[error("upstream transfer failed: {0}")]
    Transport(String),
    #[error("more than {0} redirects")]
    TooManyRedirects(u32),
    #[error("invalid redirect location {0:?}")]
    BadRedirect(String),
    #[error("upstream closed without a response")]
    NoResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyError {
    /// The target or one of its redirect hops is not allowed.
    #[error(transparent)]
    Unsafe(#[from] UnsafeTargetError),
    #[error(transparent)]
    Upstream(#[from] ProxyUpstreamError),
}

/// A `/p/` link whose target segment is not base64 of a UTF-8 URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed proxy link")]
pub struct BadLinkError;
