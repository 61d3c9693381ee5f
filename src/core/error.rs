// src/core/error.rs

use std::time::Duration;
use thiserror::Error;

use crate::core::models::{FailureKind, JobId, JobStatus};

/// Errors raised while admitting a target. Both are client-attributable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("{0}")]
    Validation(String),

    #[error("DNS resolution failed for {host}: {cause}")]
    Resolution { host: String, cause: String },
}

impl TargetError {
    pub fn invalid_format() -> Self {
        TargetError::Validation("invalid target format".to_string())
    }
}

/// Per-adapter failure modes. Recorded in the scan result, never escalated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterFailure {
    #[error("`{program}` is not installed or not executable: {cause}")]
    ToolUnavailable { program: String, cause: String },

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("failed to launch `{program}`: {cause}")]
    Launch { program: String, cause: String },

    #[error("no report produced: {0}")]
    NoReport(String),

    #[error("cancelled before completion")]
    Cancelled,
}

impl AdapterFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            AdapterFailure::ToolUnavailable { .. } => FailureKind::ToolUnavailable,
            AdapterFailure::Timeout(_) => FailureKind::Timeout,
            AdapterFailure::Launch { .. } => FailureKind::Launch,
            AdapterFailure::NoReport(_) => FailureKind::NoReport,
            AdapterFailure::Cancelled => FailureKind::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal transition from {from} to {to}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Job store failures.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("job already exists: {0}")]
    AlreadyExists(JobId),

    #[error("job {id}: {source}")]
    InvalidTransition {
        id: JobId,
        #[source]
        source: TransitionError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PersistenceError {
    /// Logic errors are never fixed by retrying the write.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PersistenceError::Io(_) | PersistenceError::Serialization(_))
    }
}

/// Faults in the dispatch/aggregation logic itself. These fail the whole job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestrationError {
    #[error("adapter task for `{scanner}` aborted: {cause}")]
    AdapterAborted { scanner: String, cause: String },

    #[error("adapter `{0}` returned no result")]
    MissingResult(String),

    #[error("orchestrator shut down before the job started")]
    ShutDown,

    #[error("interrupted by orchestrator restart")]
    Interrupted,
}

/// Errors returned synchronously by `submit`.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("failed to persist scan request: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Errors returned by `get_status`.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("scan job {0} not found")]
    NotFound(JobId),

    #[error("failed to read scan job: {0}")]
    Persistence(#[from] PersistenceError),
}
