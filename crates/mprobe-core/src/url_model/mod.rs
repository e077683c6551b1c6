//! URL modeling and filename derivation.
//!
//! Derives display filenames and content types from Content-Disposition,
//! URL paths and extensions, and builds Content-Disposition values for
//! proxied responses.

mod content_disposition;
mod mime;
mod path;
mod share_link;

pub use content_disposition::{
    format_content_disposition, parse_content_disposition_filename, DispositionKind,
};
pub use mime::mime_from_filename;
pub use path::{extension, filename_from_url_path};
pub use share_link::rewrite_share_link;

/// Filename used when neither headers nor URLs yield one.
pub const DEFAULT_FILENAME: &str = "downloaded_file";

/// Derives a filename for a resource.
///
/// Order: `content_disposition` (if present and parseable), last path segment
/// of `canonical_url`, last path segment of `original_url`, then
/// [`DEFAULT_FILENAME`].
///
/// # Examples
///
/// - `derive_filename("https://example.com/archive.zip", "https://example.com/", None)` → `"archive.zip"`
/// - `derive_filename("https://example.com/", "https://example.com/", Some("attachment; filename=\"report.pdf\""))` → `"report.pdf"`
pub fn derive_filename(
    canonical_url: &str,
    original_url: &str,
    content_disposition: Option<&str>,
) -> String {
    content_disposition
        .and_then(parse_content_disposition_filename)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| filename_from_url_path(canonical_url))
        .or_else(|| filename_from_url_path(original_url))
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}
