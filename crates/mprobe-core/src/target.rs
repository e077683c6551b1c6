//! Target URL safety checks.
//!
//! Every user-supplied URL (and every redirect hop we follow ourselves) passes
//! through [`TargetPolicy::check`] before a connection is opened. The check is
//! purely syntactic: it covers the literal host in the URL, not what a DNS name
//! later resolves to, so callers must re-check post-redirect URLs.

use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Hostnames that map to cloud instance metadata services.
const METADATA_HOSTS: &[&str] = &[
    "metadata",
    "metadata.google.internal",
    "metadata.goog",
    "instance-data",
    "instance-data.ec2.internal",
];

/// Literal addresses of cloud metadata services outside the ranges rejected below.
const METADATA_V4: &[Ipv4Addr] = &[Ipv4Addr::new(100, 100, 100, 200)];
const METADATA_V6: &[Ipv6Addr] = &[Ipv6Addr::new(0xfd00, 0xec2, 0, 0, 0, 0, 0, 0x254)];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnsafeTargetError {
    #[error("invalid URL")]
    InvalidUrl,
    #[error("unsupported URL scheme: {0}")]
    Scheme(String),
    #[error("URL has no host")]
    MissingHost,
    #[error("access to {0} is not allowed")]
    Forbidden(String),
}

/// Which targets may be contacted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetPolicy {
    /// Permit loopback/private/link-local hosts. Scheme and host presence are still checked.
    pub allow_private: bool,
}

impl TargetPolicy {
    /// The production policy.
    pub fn strict() -> Self {
        Self {
            allow_private: false,
        }
    }

    /// Allows private targets; for local development and tests against 127.0.0.1.
    pub fn permissive() -> Self {
        Self { allow_private: true }
    }

    /// Parses and checks `url`, returning the parsed form on success.
    pub fn check(&self, url: &str) -> Result<Url, UnsafeTargetError> {
        let parsed = Url::parse(url.trim()).map_err(|_| UnsafeTargetError::InvalidUrl)?;
        self.check_url(&parsed)?;
        Ok(parsed)
    }

    pub fn check_url(&self, url: &Url) -> Result<(), UnsafeTargetError> {
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(UnsafeTargetError::Scheme(other.to_string())),
        }
        let host = url.host().ok_or(UnsafeTargetError::MissingHost)?;
        if self.allow_private {
            return Ok(());
        }
        let blocked = match &host {
            Host::Domain(d) => is_blocked_domain(d),
            Host::Ipv4(ip) => is_blocked_v4(*ip),
            Host::Ipv6(ip) => is_blocked_v6(*ip),
        };
        if blocked {
            return Err(UnsafeTargetError::Forbidden(host.to_string()));
        }
        Ok(())
    }
}

/// Checks `url` with the strict policy.
pub fn validate_target(url: &str) -> Result<(), UnsafeTargetError> {
    TargetPolicy::strict().check(url).map(|_| ())
}

fn is_blocked_domain(domain: &str) -> bool {
    let d = domain.trim_end_matches('.').to_ascii_lowercase();
    d == "localhost" || d.ends_with(".localhost") || METADATA_HOSTS.contains(&d.as_str())
}

fn is_blocked_v4(ip: Ipv4Addr) -> bool {
    let [a, b, _, _] = ip.octets();
    a == 127
        || a == 10
        || (a == 192 && b == 168)
        || (a == 172 && (16..=31).contains(&b))
        || (a == 169 && b == 254)
        || ip.is_unspecified()
        || METADATA_V4.contains(&ip)
}

fn is_blocked_v6(ip: Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() || METADATA_V6.contains(&ip) {
        return true;
    }
    match ip.to_ipv4_mapped() {
        Some(v4) => is_blocked_v4(v4),
        None => false,
    }
}
