//! Per-run analysis options.

use crate::config::DEFAULT_CHUNK_SIZE;
use std::fmt;
use std::str::FromStr;

/// Report format requested by the caller.
///
/// `Object` is the structured form (normalized JSON value); the others are
/// raw text returned exactly as the core rendered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Object,
    Json,
    Xml,
    Html,
    Text,
}

impl ReportFormat {
    pub fn is_structured(self) -> bool {
        self == ReportFormat::Object
    }

    /// Name used as the key of `results` in API responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ReportFormat::Object => "object",
            ReportFormat::Json => "JSON",
            ReportFormat::Xml => "XML",
            ReportFormat::Html => "HTML",
            ReportFormat::Text => "text",
        }
    }

    /// Value of the core's `output` option. Structured reports are rendered as JSON.
    pub fn core_output(self) -> &'static str {
        match self {
            ReportFormat::Object | ReportFormat::Json => "JSON",
            ReportFormat::Xml => "XML",
            ReportFormat::Html => "HTML",
            ReportFormat::Text => "Text",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown format {0:?} (expected object, JSON, XML, HTML or text)")]
pub struct UnknownFormat(pub String);

impl FromStr for ReportFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "object" => Ok(ReportFormat::Object),
            "json" => Ok(ReportFormat::Json),
            "xml" => Ok(ReportFormat::Xml),
            "html" => Ok(ReportFormat::Html),
            "text" => Ok(ReportFormat::Text),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Options for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Maximum bytes per fetch.
    pub chunk_size: u32,
    /// Include embedded cover art (base64) in the report.
    pub cover_data: bool,
    pub format: ReportFormat,
    /// Report every field the core knows, not just the common ones.
    pub full_detail: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            cover_data: false,
            format: ReportFormat::Object,
            full_detail: false,
        }
    }
}

impl AnalysisOptions {
    /// `(name, value)` pairs handed to the core's option setter.
    pub fn core_options(&self) -> [(&'static str, &'static str); 3] {
        [
            ("output", self.format.core_output()),
            ("cover_data", if self.cover_data { "base64" } else { "" }),
            ("complete", if self.full_detail { "1" } else { "0" }),
        ]
    }
}
