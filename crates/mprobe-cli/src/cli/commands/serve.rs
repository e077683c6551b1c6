//! `mprobe serve` – run the HTTP service until Ctrl-C.

use anyhow::Result;
use mprobe_core::config::MprobeConfig;
use mprobe_core::engine::builtin_factory;
use mprobe_core::server;

pub async fn run_serve(mut cfg: MprobeConfig, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        cfg.bind = bind;
    }
    println!("Listening on http://{}", cfg.bind);
    server::bind_and_serve(cfg, builtin_factory(), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("ctrl-c handler failed: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("ctrl-c received, shutting down");
    })
    .await
}
