//! Incremental analysis: the driver that feeds an [`AnalysisCore`] from a
//! [`ChunkSource`](crate::chunk::ChunkSource), following the core's seek requests.
//!
//! Containers often keep their index far from the start of the file (e.g. a
//! trailing `moov` box), so the core may ask to continue at any offset, backwards
//! or forwards. Only the ranges it asks for are fetched, one at a time and in the
//! order requested.

mod core_api;
mod driver;
mod error;
mod options;
mod seek;

pub use core_api::{AnalysisCore, CoreError, CoreFactory, FeedStatus, SharedCoreFactory};
pub use driver::{
    AnalysisDriver, AnalysisOutput, AnalysisReport, AnalysisState, AnalysisStats,
};
pub use error::{AnalysisError, AnalysisFailure, ConcurrentAnalysisError, FailureCause};
pub use options::{AnalysisOptions, ReportFormat, UnknownFormat};
pub use seek::{decode_seek_words, encode_seek_words, SeekInstruction};
