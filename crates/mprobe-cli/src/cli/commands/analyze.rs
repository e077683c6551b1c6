//! `mprobe analyze <url>` – run the built-in analyzer over ranged reads.

use anyhow::{Context, Result};
use mprobe_core::analysis::{AnalysisDriver, AnalysisOptions, AnalysisOutput, ReportFormat};
use mprobe_core::chunk::RangedChunkProvider;
use mprobe_core::config::MprobeConfig;
use mprobe_core::context::RequestContext;
use mprobe_core::engine::builtin_factory;
use mprobe_core::resolver;

pub async fn run_analyze(
    cfg: &MprobeConfig,
    url: &str,
    format: &str,
    cover: bool,
    full: bool,
) -> Result<()> {
    let format: ReportFormat = format.parse()?;
    let ctx = RequestContext::new(None);
    let desc = resolver::resolve(url, &super::policy(cfg), &cfg.http, &ctx).await?;

    let options = AnalysisOptions {
        chunk_size: cfg.analysis.chunk_size,
        cover_data: cover,
        format,
        full_detail: full,
    };
    let source = RangedChunkProvider::new(
        desc.canonical_url.clone(),
        desc.total_size,
        options.chunk_size,
        cfg.http.clone(),
    );
    let driver = AnalysisDriver::new(builtin_factory(), cfg.analysis.max_requests);
    let report = driver
        .run(&source, &options, &ctx)
        .await
        .with_context(|| format!("analyzing {}", desc.canonical_url))?;
    tracing::info!(
        "analyzed {} in {} requests ({} bytes, {} seeks)",
        desc.canonical_url,
        report.stats.requests,
        report.stats.bytes_fetched,
        report.stats.seeks
    );

    match report.output {
        AnalysisOutput::Structured(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        AnalysisOutput::Text(text) => print!("{}", text),
    }
    Ok(())
}
