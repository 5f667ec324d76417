//! Pipeline failure taxonomy.

use std::fmt;

use thiserror::Error;

/// Pipeline stage in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Resolve,
    Fetch,
    Extract,
    Chunk,
    Embed,
    Store,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Fetch => "fetch",
            Self::Extract => "extract",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
            Self::Store => "store",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What went wrong, independent of the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No primary document could be located
    Resolution,
    /// Transport failure or non-2xx response
    Http,
    Timeout,
    /// Response exceeded the configured size limit
    TooLarge,
    /// Unreadable or unsupported content
    Parse,
    /// Nothing left after extraction
    Empty,
    Embedding,
    Storage,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolution => "resolution",
            Self::Http => "http",
            Self::Timeout => "timeout",
            Self::TooLarge => "too_large",
            Self::Parse => "parse",
            Self::Empty => "empty",
            Self::Embedding => "embedding",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error that fails a single ingestion event. The display form is what gets
/// stored as the event's `error_message`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage}/{kind}: {detail}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    pub kind: FailureKind,
    pub detail: String,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            detail: detail.into(),
        }
    }

    /// Wraps an infrastructure error, keeping its context chain.
    pub fn from_anyhow(stage: PipelineStage, kind: FailureKind, err: &anyhow::Error) -> Self {
        Self::new(stage, kind, format!("{:#}", err))
    }
}
