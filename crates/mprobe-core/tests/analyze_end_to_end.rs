//! Resolve, then analyze a remote MP4 whose index sits after the media data.

mod common;

use common::{mp4, range_server};
use mprobe_core::analysis::{AnalysisDriver, AnalysisOptions, AnalysisOutput, ReportFormat};
use mprobe_core::chunk::RangedChunkProvider;
use mprobe_core::config::HttpConfig;
use mprobe_core::context::RequestContext;
use mprobe_core::engine::builtin_factory;
use mprobe_core::resolver;
use mprobe_core::target::TargetPolicy;

const MDAT_LEN: usize = 3 * 1024 * 1024;
const CHUNK: u32 = 64 * 1024;

async fn analyze(format: ReportFormat) -> (AnalysisOutput, range_server::RangeServer, u32) {
    let server = range_server::start(mp4::trailing_moov(MDAT_LEN));
    let ctx = RequestContext::default();
    let http = HttpConfig::default();
    let desc = resolver::resolve(
        &server.url("movie.mp4"),
        &TargetPolicy::permissive(),
        &http,
        &ctx,
    )
    .await
    .unwrap();

    let options = AnalysisOptions {
        chunk_size: CHUNK,
        format,
        ..AnalysisOptions::default()
    };
    let source = RangedChunkProvider::new(desc.canonical_url, desc.total_size, CHUNK, http);
    let driver = AnalysisDriver::new(builtin_factory(), 64);
    let report = driver.run(&source, &options, &ctx).await.unwrap();
    (report.output, server, report.stats.requests)
}

#[tokio::test]
async fn trailing_moov_is_read_without_downloading_mdat() {
    let (output, server, requests) = analyze(ReportFormat::Object).await;

    let value = match output {
        AnalysisOutput::Structured(v) => v,
        other => panic!("expected structured output, got {:?}", other),
    };
    let tracks = value["media"]["track"].as_array().unwrap();
    assert_eq!(tracks[0]["@type"], "General");
    assert_eq!(tracks[0]["Duration"], 4.0);
    assert_eq!(tracks[1]["@type"], "Video");
    assert_eq!(tracks[1]["Width"], 640);
    assert_eq!(tracks[1]["Height"], 360);
    assert_eq!(tracks[1]["FrameRate"], 25.0);
    assert_eq!(tracks[1]["Format"], "AVC");

    // The first chunk, then straight to the moov.
    assert_eq!(requests, 2);
    let ranges = server.get_ranges();
    let moov_at = mp4::moov_offset(MDAT_LEN);
    let analysis_ranges: Vec<(u64, u64)> = ranges.into_iter().filter(|r| *r != (0, 0)).collect();
    assert_eq!(analysis_ranges[0], (0, u64::from(CHUNK) - 1));
    assert_eq!(analysis_ranges[1].0, moov_at);
    let fetched: u64 = analysis_ranges.iter().map(|(a, b)| b - a + 1).sum();
    assert!(fetched < (MDAT_LEN / 10) as u64);
}

#[tokio::test]
async fn text_report_is_returned_verbatim() {
    let (output, _server, _) = analyze(ReportFormat::Text).await;
    let text = match output {
        AnalysisOutput::Text(t) => t,
        other => panic!("expected text output, got {:?}", other),
    };
    assert!(text.starts_with("General\n"));
    assert!(text.contains("\n\nVideo\n"));
    assert!(text.lines().any(|l| l.starts_with("Width") && l.ends_with(": 640")));
}
