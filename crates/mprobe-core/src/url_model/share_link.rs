//! Rewrites cloud-drive share pages to their direct-download endpoint.

use url::Url;

const DRIVE_HOST: &str = "drive.google.com";

/// Returns the direct-download URL for a recognized share link, or `None`.
///
/// Handles `https://drive.google.com/file/d/<id>/view` (any trailing path or
/// query) and `https://drive.google.com/open?id=<id>`.
pub fn rewrite_share_link(url: &Url) -> Option<Url> {
    if url.host_str()? != DRIVE_HOST {
        return None;
    }
    let segments: Vec<&str> = url.path_segments()?.collect();
    let id = match segments.as_slice() {
        ["file", "d", id, ..] if !id.is_empty() => id.to_string(),
        ["open"] => url
            .query_pairs()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.into_owned())?,
        _ => return None,
    };
    let mut direct = Url::parse("https://drive.google.com/uc").ok()?;
    direct
        .query_pairs_mut()
        .append_pair("export", "download")
        .append_pair("id", &id);
    Some(direct)
}
