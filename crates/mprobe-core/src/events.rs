//! Progress events emitted by the analysis driver and proxy streamer.
//!
//! Callers that want telemetry pass an [`EventSink`]; nothing here depends on
//! a particular logging backend.

use crate::analysis::AnalysisStats;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    AnalysisStarted {
        request_id: u64,
        total_size: Option<u64>,
    },
    ChunkFetched {
        request_id: u64,
        offset: u64,
        len: usize,
    },
    Seek {
        request_id: u64,
        from: u64,
        to: u64,
    },
    AnalysisCompleted {
        request_id: u64,
        stats: AnalysisStats,
    },
    AnalysisFailed {
        request_id: u64,
        offset: u64,
        reason: String,
    },
    ProxyStarted {
        request_id: u64,
        status: u16,
        ranged: bool,
    },
    ProxyFinished {
        request_id: u64,
        bytes: u64,
    },
}

pub type EventSink = mpsc::UnboundedSender<Event>;

/// Sends `event` if a sink is attached. A closed receiver is ignored.
pub fn emit(sink: Option<&EventSink>, event: Event) {
    if let Some(sink) = sink {
        let _ = sink.send(event);
    }
}

/// Drains `rx` into tracing at debug level until every sender is dropped.
pub async fn log_events(mut rx: mpsc::UnboundedReceiver<Event>) {
    while let Some(event) = rx.recv().await {
        match &event {
            Event::AnalysisFailed { .. } => tracing::warn!(?event, "analysis event"),
            _ => tracing::debug!(?event, "event"),
        }
    }
}
