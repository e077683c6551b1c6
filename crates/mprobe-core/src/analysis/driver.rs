//! The seek-driven feed loop.

use super::core_api::{AnalysisCore, CoreError, FeedStatus, SharedCoreFactory};
use super::error::{AnalysisError, AnalysisFailure, ConcurrentAnalysisError, FailureCause};
use super::options::AnalysisOptions;
use super::seek::{decode_seek_words, SeekInstruction};
use crate::chunk::{ChunkRequest, ChunkSource};
use crate::context::RequestContext;
use crate::events::{emit, Event, EventSink};
use crate::normalize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::Instrument;

/// Lifecycle of the driver's current (or last) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    Idle,
    Feeding,
    Finalizing,
    Complete,
    Failed,
}

impl AnalysisState {
    pub fn is_active(self) -> bool {
        matches!(self, AnalysisState::Feeding | AnalysisState::Finalizing)
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisStats {
    pub requests: u32,
    pub bytes_fetched: u64,
    pub seeks: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutput {
    /// Normalized report (or the unnormalized value if normalization failed).
    Structured(Value),
    /// Report text exactly as the core rendered it.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub output: AnalysisOutput,
    pub stats: AnalysisStats,
}

/// Runs analyses with one exclusively owned core at a time.
pub struct AnalysisDriver {
    factory: SharedCoreFactory,
    max_requests: u32,
    events: Option<EventSink>,
    busy: AtomicBool,
    state: Mutex<AnalysisState>,
    core: Mutex<Option<Box<dyn AnalysisCore>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clears the busy flag when a run ends, including when its future is dropped.
struct RunGuard<'a> {
    driver: &'a AnalysisDriver,
    finished: bool,
}

impl RunGuard<'_> {
    fn finish(mut self, state: AnalysisState) {
        self.driver.set_state(state);
        self.finished = true;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            // Abandoned mid-run; the core is disposed by the next start or reset.
            self.driver.set_state(AnalysisState::Failed);
        }
        self.driver.busy.store(false, Ordering::Release);
    }
}

impl AnalysisDriver {
    pub fn new(factory: SharedCoreFactory, max_requests: u32) -> Self {
        Self {
            factory,
            max_requests: max_requests.max(1),
            events: None,
            busy: AtomicBool::new(false),
            state: Mutex::new(AnalysisState::Idle),
            core: Mutex::new(None),
        }
    }

    pub fn with_events(mut self, sink: EventSink) -> Self {
        self.events = Some(sink);
        self
    }

    pub fn state(&self) -> AnalysisState {
        *lock(&self.state)
    }

    fn set_state(&self, state: AnalysisState) {
        *lock(&self.state) = state;
    }

    /// Disposes the current core and returns to `Idle`.
    pub fn reset(&self) -> Result<(), ConcurrentAnalysisError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ConcurrentAnalysisError);
        }
        if let Some(mut core) = lock(&self.core).take() {
            core.dispose();
        }
        self.set_state(AnalysisState::Idle);
        self.busy.store(false, Ordering::Release);
        Ok(())
    }

    /// Claims the driver and installs a freshly configured core.
    fn start(
        &self,
        total_size: Option<u64>,
        options: &AnalysisOptions,
    ) -> Result<RunGuard<'_>, AnalysisError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ConcurrentAnalysisError.into());
        }
        let guard = RunGuard {
            driver: self,
            finished: false,
        };

        let mut slot = lock(&self.core);
        if let Some(mut old) = slot.take() {
            old.dispose();
        }
        let mut core = self.factory.create();
        let setup = options
            .core_options()
            .iter()
            .try_for_each(|(name, value)| core.set_option(name, value))
            .and_then(|()| core.open(total_size, 0));
        if let Err(e) = setup {
            core.dispose();
            drop(slot);
            guard.finish(AnalysisState::Failed);
            return Err(AnalysisError::Setup(e));
        }
        *slot = Some(core);
        drop(slot);

        self.set_state(AnalysisState::Feeding);
        Ok(guard)
    }

    /// Analyzes the file behind `source`, fetching only what the core asks for.
    ///
    /// Rejects immediately with [`ConcurrentAnalysisError`] if a run is in progress.
    pub async fn run(
        &self,
        source: &dyn ChunkSource,
        options: &AnalysisOptions,
        ctx: &RequestContext,
    ) -> Result<AnalysisReport, AnalysisError> {
        let total_size = source.total_size();
        let guard = self.start(total_size, options)?;
        let span = ctx.span("analyze");
        emit(
            self.events.as_ref(),
            Event::AnalysisStarted {
                request_id: ctx.request_id,
                total_size,
            },
        );

        match self
            .feed_and_finalize(source, total_size, options, ctx)
            .instrument(span)
            .await
        {
            Ok(report) => {
                guard.finish(AnalysisState::Complete);
                emit(
                    self.events.as_ref(),
                    Event::AnalysisCompleted {
                        request_id: ctx.request_id,
                        stats: report.stats,
                    },
                );
                Ok(report)
            }
            Err(failure) => {
                guard.finish(AnalysisState::Failed);
                tracing::warn!(
                    "{} analysis failed at offset {} after {} requests ({} bytes): {}",
                    ctx,
                    failure.offset,
                    failure.requests,
                    failure.bytes_fetched,
                    failure.cause
                );
                emit(
                    self.events.as_ref(),
                    Event::AnalysisFailed {
                        request_id: ctx.request_id,
                        offset: failure.offset,
                        reason: failure.cause.to_string(),
                    },
                );
                Err(failure.into())
            }
        }
    }

    /// Runs `f` against the installed core.
    fn with_core<R>(
        &self,
        f: impl FnOnce(&mut dyn AnalysisCore) -> Result<R, CoreError>,
    ) -> Result<R, CoreError> {
        let mut slot = lock(&self.core);
        let core = slot.as_mut().ok_or(CoreError::NotOpen)?;
        f(core.as_mut())
    }

    async fn feed_and_finalize(
        &self,
        source: &dyn ChunkSource,
        total_size: Option<u64>,
        options: &AnalysisOptions,
        ctx: &RequestContext,
    ) -> Result<AnalysisReport, AnalysisFailure> {
        let mut stats = AnalysisStats::default();
        let mut offset: u64 = 0;
        let chunk_size = options.chunk_size.max(1);
        let fail = |offset: u64, stats: &AnalysisStats, cause: FailureCause| AnalysisFailure {
            offset,
            requests: stats.requests,
            bytes_fetched: stats.bytes_fetched,
            cause,
        };

        loop {
            let req = match ChunkRequest::bounded(offset, chunk_size, total_size) {
                Some(req) => req,
                None => break,
            };
            if stats.requests >= self.max_requests {
                return Err(fail(
                    offset,
                    &stats,
                    FailureCause::RequestLimit(self.max_requests),
                ));
            }

            let data = source
                .fetch(req.offset, req.size)
                .await
                .map_err(|e| fail(offset, &stats, e.into()))?;
            stats.requests += 1;
            stats.bytes_fetched += data.len() as u64;
            emit(
                self.events.as_ref(),
                Event::ChunkFetched {
                    request_id: ctx.request_id,
                    offset,
                    len: data.len(),
                },
            );
            if data.is_empty() {
                break;
            }

            let instruction = self
                .with_core(|core| {
                    Ok(match core.feed(&data)? {
                        FeedStatus::NeedMore => SeekInstruction::Continue,
                        FeedStatus::Finished => SeekInstruction::Done,
                        FeedStatus::SeekRequested => {
                            let (low, high) = core.seek_words();
                            let instruction = decode_seek_words(low, high);
                            if let SeekInstruction::SeekTo(target) = instruction {
                                core.reposition(target)?;
                            }
                            instruction
                        }
                    })
                })
                .map_err(|e| fail(offset, &stats, e.into()))?;

            match instruction {
                SeekInstruction::Continue => offset += data.len() as u64,
                SeekInstruction::SeekTo(target) => {
                    tracing::debug!("{} seek {} -> {}", ctx, offset, target);
                    emit(
                        self.events.as_ref(),
                        Event::Seek {
                            request_id: ctx.request_id,
                            from: offset,
                            to: target,
                        },
                    );
                    stats.seeks += 1;
                    offset = target;
                }
                SeekInstruction::Done => break,
            }
        }

        self.set_state(AnalysisState::Finalizing);
        let text = self
            .with_core(|core| {
                core.finalize()?;
                core.inform()
            })
            .map_err(|e| fail(offset, &stats, e.into()))?;
        tracing::debug!(
            "{} analysis finished: {} requests, {} bytes, {} seeks",
            ctx,
            stats.requests,
            stats.bytes_fetched,
            stats.seeks
        );

        let output = if options.format.is_structured() {
            match normalize::normalize(&text) {
                Ok(value) => AnalysisOutput::Structured(value),
                Err(e) => {
                    tracing::warn!("{} report not normalized: {}", ctx, e);
                    AnalysisOutput::Structured(e.into_value(text))
                }
            }
        } else {
            AnalysisOutput::Text(text)
        };
        Ok(AnalysisReport { output, stats })
    }
}

impl Drop for AnalysisDriver {
    fn drop(&mut self) {
        if let Some(mut core) = lock(&self.core).take() {
            core.dispose();
        }
    }
}
