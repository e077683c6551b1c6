//! `mprobe info <url>` – resolve and print metadata.

use anyhow::Result;
use mprobe_core::config::MprobeConfig;
use mprobe_core::context::RequestContext;
use mprobe_core::resolver;

pub async fn run_info(cfg: &MprobeConfig, url: &str) -> Result<()> {
    let ctx = RequestContext::new(None);
    let desc = resolver::resolve(url, &super::policy(cfg), &cfg.http, &ctx).await?;
    let size = desc
        .total_size
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    let kind = if desc.content_type.is_empty() {
        "-"
    } else {
        desc.content_type.as_str()
    };
    println!("{:<10} {}", "URL", desc.canonical_url);
    println!("{:<10} {}", "FILENAME", desc.filename);
    println!("{:<10} {}", "SIZE", size);
    println!("{:<10} {}", "TYPE", kind);
    Ok(())
}
