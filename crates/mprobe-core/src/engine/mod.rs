//! Built-in analysis core for MP4/MOV (ISO-BMFF) files.
//!
//! Walks top-level boxes and asks the driver to seek over anything it does
//! not need (`mdat` in particular), so a file with a trailing `moov` costs a
//! few small requests instead of a full download. Other containers are
//! recognized by their magic bytes and reported by name only.

mod boxes;
mod moov;
mod report;
mod sniff;

use crate::analysis::{encode_seek_words, AnalysisCore, CoreError, FeedStatus, SharedCoreFactory};
use boxes::parse_header;
use moov::MovieInfo;
use report::{MediaReport, Output, ReportInput};
use sniff::Container;
use std::sync::Arc;

/// Largest `moov` the core buffers before giving up.
const MAX_MOOV: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Open,
    Finalized,
    Disposed,
}

pub struct IsoBmffCore {
    output: Output,
    cover: bool,
    complete: bool,
    lifecycle: Lifecycle,
    total_size: Option<u64>,
    /// File offset of `buf[0]`.
    cursor: u64,
    buf: Vec<u8>,
    /// File offset of the next top-level box header.
    next_box: u64,
    container: Option<Container>,
    brand: Option<[u8; 4]>,
    movie: Option<MovieInfo>,
    mdat_seen: bool,
    seek_target: Option<u64>,
}

impl Default for IsoBmffCore {
    fn default() -> Self {
        Self {
            output: Output::Json,
            cover: false,
            complete: false,
            lifecycle: Lifecycle::Created,
            total_size: None,
            cursor: 0,
            buf: Vec::new(),
            next_box: 0,
            container: None,
            brand: None,
            movie: None,
            mdat_seen: false,
            seek_target: None,
        }
    }
}

/// Factory producing [`IsoBmffCore`] instances.
pub fn builtin_factory() -> SharedCoreFactory {
    Arc::new(|| Box::new(IsoBmffCore::default()) as Box<dyn AnalysisCore>)
}

enum Step {
    Next,
    Status(FeedStatus),
}

impl IsoBmffCore {
    fn ensure_open(&self) -> Result<(), CoreError> {
        match self.lifecycle {
            Lifecycle::Open => Ok(()),
            Lifecycle::Disposed => Err(CoreError::Disposed),
            Lifecycle::Created | Lifecycle::Finalized => Err(CoreError::NotOpen),
        }
    }

    fn at_end(&self, offset: u64) -> bool {
        self.total_size.is_some_and(|total| offset >= total)
    }

    /// Drops buffered bytes that precede `next_box`.
    fn discard_before_next(&mut self) {
        let skip = self.next_box.saturating_sub(self.cursor);
        let n = usize::try_from(skip).map_or(self.buf.len(), |s| s.min(self.buf.len()));
        self.buf.drain(..n);
        self.cursor += n as u64;
    }

    /// File offset just past a box of `size` bytes starting at `next_box`.
    fn box_end(&self, header: &boxes::BoxHeader, size: u64) -> Result<u64, CoreError> {
        let kind = boxes::fourcc(&header.kind);
        let end = self.next_box.checked_add(size).ok_or_else(|| {
            CoreError::Malformed(format!("box {} at {} overflows", kind, self.next_box))
        })?;
        match self.total_size {
            Some(total) if end > total => Err(CoreError::Malformed(format!(
                "box {} at {} ends at {}, past the end of the file ({})",
                kind, self.next_box, end, total
            ))),
            _ => Ok(end),
        }
    }

    /// Handles the box at `next_box`, or says what is needed to do so.
    fn step(&mut self) -> Result<Step, CoreError> {
        if self.at_end(self.next_box) {
            return Ok(Step::Status(FeedStatus::Finished));
        }
        let buffered_end = self.cursor + self.buf.len() as u64;
        if self.next_box < self.cursor || self.next_box > buffered_end {
            self.seek_target = Some(self.next_box);
            return Ok(Step::Status(FeedStatus::SeekRequested));
        }
        self.discard_before_next();
        let header = match parse_header(&self.buf).map_err(CoreError::Malformed)? {
            Some(h) => h,
            None => return Ok(Step::Status(FeedStatus::NeedMore)),
        };
        let size = header.size.or_else(|| {
            self.total_size
                .map(|total| total.saturating_sub(self.next_box))
        });
        let end = match size {
            Some(s) => Some(self.box_end(&header, s)?),
            None => None,
        };

        if header.is(b"moov") || header.is(b"ftyp") {
            let size = match size {
                Some(s) => s,
                // Unknown extent and unknown file size: nothing to bound the read.
                None => return Err(CoreError::Malformed("unbounded moov box".to_string())),
            };
            if header.is(b"moov") && size > MAX_MOOV {
                return Err(CoreError::Malformed(format!("moov box of {} bytes", size)));
            }
            let len = usize::try_from(size)
                .map_err(|_| CoreError::Malformed("box too large".to_string()))?;
            if self.buf.len() < len {
                return Ok(Step::Status(FeedStatus::NeedMore));
            }
            let body = &self.buf[header.header_len as usize..len];
            if header.is(b"ftyp") {
                self.brand = body.get(..4).and_then(|b| b.try_into().ok());
            } else {
                self.movie = Some(moov::parse_moov(body));
                tracing::debug!("moov parsed at offset {} ({} bytes)", self.next_box, size);
                return Ok(Step::Status(FeedStatus::Finished));
            }
        } else if header.is(b"mdat") && self.movie.is_none() {
            self.mdat_seen = true;
        }

        match end {
            Some(end) => {
                self.next_box = end;
                Ok(Step::Next)
            }
            // Last box of a stream of unknown length.
            None => Ok(Step::Status(FeedStatus::Finished)),
        }
    }

    fn feed_boxes(&mut self) -> Result<FeedStatus, CoreError> {
        loop {
            match self.step()? {
                Step::Next => {
                    let buffered_end = self.cursor + self.buf.len() as u64;
                    if self.next_box == buffered_end && !self.at_end(self.next_box) {
                        // Next box starts right after what we have: read on.
                        self.buf.clear();
                        self.cursor = buffered_end;
                        return Ok(FeedStatus::NeedMore);
                    }
                }
                Step::Status(status) => return Ok(status),
            }
        }
    }

    fn report(&self) -> MediaReport {
        let format_name = match self.container {
            Some(Container::Other(name)) => Some(name),
            _ => None,
        };
        let input = ReportInput {
            file_size: self.total_size,
            brand: self.brand,
            streamable: self.movie.as_ref().map(|_| !self.mdat_seen),
            cover: self.cover,
            complete: self.complete,
            format_name,
        };
        match (&self.movie, self.container) {
            (Some(movie), _) => MediaReport::from_movie(movie, &input),
            (None, Some(Container::IsoBmff)) => MediaReport::general_only(&ReportInput {
                format_name: Some("MPEG-4"),
                ..input
            }),
            _ => MediaReport::general_only(&input),
        }
    }
}

impl AnalysisCore for IsoBmffCore {
    fn set_option(&mut self, name: &str, value: &str) -> Result<(), CoreError> {
        if self.lifecycle == Lifecycle::Disposed {
            return Err(CoreError::Disposed);
        }
        let invalid = || CoreError::InvalidOption {
            name: name.to_string(),
            value: value.to_string(),
        };
        match name.to_ascii_lowercase().as_str() {
            "output" | "inform" => self.output = Output::parse(value).ok_or_else(invalid)?,
            "cover_data" => {
                self.cover = match value.to_ascii_lowercase().as_str() {
                    "" => false,
                    "base64" => true,
                    _ => return Err(invalid()),
                }
            }
            "complete" => {
                self.complete = match value {
                    "0" | "" => false,
                    "1" => true,
                    _ => return Err(invalid()),
                }
            }
            _ => return Err(CoreError::UnknownOption(name.to_string())),
        }
        Ok(())
    }

    fn open(&mut self, total_size: Option<u64>, offset: u64) -> Result<(), CoreError> {
        if self.lifecycle == Lifecycle::Disposed {
            return Err(CoreError::Disposed);
        }
        self.lifecycle = Lifecycle::Open;
        self.total_size = total_size;
        self.cursor = offset;
        self.next_box = offset;
        self.buf.clear();
        Ok(())
    }

    fn feed(&mut self, data: &[u8]) -> Result<FeedStatus, CoreError> {
        self.ensure_open()?;
        self.seek_target = None;
        self.buf.extend_from_slice(data);

        let container = match self.container {
            Some(c) => c,
            None => {
                let short = self.buf.len() < sniff::SNIFF_LEN
                    && !self.at_end(self.cursor + self.buf.len() as u64);
                let detected = sniff::detect(&self.buf);
                if detected != Container::IsoBmff && short {
                    return Ok(FeedStatus::NeedMore);
                }
                tracing::debug!("detected container {:?}", detected);
                self.container = Some(detected);
                detected
            }
        };
        match container {
            Container::IsoBmff => self.feed_boxes(),
            Container::Other(_) | Container::Unknown => Ok(FeedStatus::Finished),
        }
    }

    fn seek_words(&self) -> (i32, i32) {
        self.seek_target.map_or((-1, -1), encode_seek_words)
    }

    fn reposition(&mut self, offset: u64) -> Result<(), CoreError> {
        self.ensure_open()?;
        self.cursor = offset;
        self.next_box = offset;
        self.buf.clear();
        self.seek_target = None;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), CoreError> {
        self.ensure_open()?;
        self.lifecycle = Lifecycle::Finalized;
        self.buf = Vec::new();
        Ok(())
    }

    fn inform(&self) -> Result<String, CoreError> {
        match self.lifecycle {
            Lifecycle::Finalized | Lifecycle::Open => Ok(self.report().render(self.output)),
            Lifecycle::Created => Err(CoreError::NotOpen),
            Lifecycle::Disposed => Err(CoreError::Disposed),
        }
    }

    fn dispose(&mut self) {
        self.lifecycle = Lifecycle::Disposed;
        self.buf = Vec::new();
        self.movie = None;
    }
}
