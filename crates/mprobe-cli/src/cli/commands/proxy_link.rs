//! `mprobe proxy-link <base> <url> [filename]` – print a `/p/` link.

use anyhow::Result;
use mprobe_core::config::MprobeConfig;
use mprobe_core::context::RequestContext;
use mprobe_core::proxy::proxy_link;
use mprobe_core::resolver;

pub async fn run_proxy_link(
    cfg: &MprobeConfig,
    base: &str,
    url: &str,
    filename: Option<String>,
) -> Result<()> {
    let policy = super::policy(cfg);
    let filename = match filename {
        Some(name) => {
            policy.check(url)?;
            name
        }
        None => {
            let ctx = RequestContext::new(None);
            resolver::resolve(url, &policy, &cfg.http, &ctx).await?.filename
        }
    };
    println!("{}", proxy_link(base, url, &filename));
    Ok(())
}
