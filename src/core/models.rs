// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use strum::{Display, EnumIter, EnumString};
use tracing::warn;
use uuid::Uuid;

use crate::core::error::{TargetError, TransitionError};

/// Identifier of a scan job.
pub type JobId = Uuid;

// --- Categorie e Stati ---
// Categories and States

/// The fixed set of scan categories a caller can request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ScanCategory {
    #[default]
    Quick,
    Full,
    Network,
    Web,
    Ssl,
}

impl ScanCategory {
    /// Parses a caller-supplied category. Missing, blank or unknown values fall
    /// back to `QUICK`.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::default(),
            Some(value) => value.parse().unwrap_or_else(|_| {
                warn!(category = value, "Unknown scan category, defaulting to QUICK.");
                Self::Quick
            }),
        }
    }
}

/// Lifecycle states of a job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// `QUEUED -> FAILED` covers jobs abandoned before a worker picked them up.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::InProgress)
                | (JobStatus::Queued, JobStatus::Failed)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::InProgress, JobStatus::Failed)
        )
    }
}

// --- Opzioni di Scansione ---
// Scan Options

/// A single scalar tuning value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Open mapping of tool-tuning parameters. Adapters pick the keys they know
/// and ignore the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanOptions(BTreeMap<String, OptionValue>);

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: OptionValue) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    /// Converts a JSON object into options, rejecting arrays, objects and nulls.
    pub fn from_json(map: Map<String, Value>) -> Result<Self, TargetError> {
        let mut options = BTreeMap::new();
        for (key, value) in map {
            let converted = match value {
                Value::Bool(b) => OptionValue::Bool(b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => OptionValue::Integer(i),
                    None => OptionValue::Float(n.as_f64().unwrap_or_default()),
                },
                Value::String(s) => OptionValue::Text(s),
                _ => {
                    return Err(TargetError::Validation(format!(
                        "scan option `{key}` must be a string, number or boolean"
                    )));
                }
            };
            options.insert(key, converted);
        }
        Ok(Self(options))
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(OptionValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(OptionValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(OptionValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// A TCP port given as an integer in `1..=65535`.
    pub fn get_port(&self, key: &str) -> Option<u16> {
        self.get_int(key)
            .and_then(|p| u16::try_from(p).ok())
            .filter(|p| *p != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Opaque reference to whoever submitted a job. Stored, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(pub String);

// --- Risultati degli Scanner ---
// Scanner Results

/// Why an adapter did not produce a usable report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    ToolUnavailable,
    Timeout,
    Launch,
    NoReport,
    Cancelled,
}

/// Outcome of running one adapter. Embedded in the job record, in dispatch
/// table order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub scanner_name: String,
    pub succeeded: bool,
    pub duration_ms: u64,
    pub raw_output: String,
    pub diagnostics: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default)]
    pub output_truncated: bool,
}

impl ScanResult {
    pub fn success(
        scanner_name: &str,
        duration_ms: u64,
        raw_output: String,
        diagnostics: String,
    ) -> Self {
        Self {
            scanner_name: scanner_name.to_string(),
            succeeded: true,
            duration_ms,
            raw_output,
            diagnostics,
            failure_reason: None,
            failure_kind: None,
            warning: None,
            output_truncated: false,
        }
    }

    pub fn failure(
        scanner_name: &str,
        duration_ms: u64,
        kind: FailureKind,
        reason: String,
        diagnostics: String,
    ) -> Self {
        Self {
            scanner_name: scanner_name.to_string(),
            succeeded: false,
            duration_ms,
            raw_output: String::new(),
            diagnostics,
            failure_reason: Some(reason),
            failure_kind: Some(kind),
            warning: None,
            output_truncated: false,
        }
    }

    pub fn with_warning(mut self, warning: String) -> Self {
        self.warning = Some(warning);
        self
    }

    pub fn with_truncation(mut self, truncated: bool) -> Self {
        self.output_truncated = truncated;
        self
    }
}

// --- Record del Job ---
// Job Record

/// A target that passed validation and resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub canonical: String,
    pub resolved_ip: Ipv4Addr,
}

/// The persisted unit of scan-request state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: JobId,
    pub target: String,
    pub resolved_ip: Ipv4Addr,
    pub scan_category: ScanCategory,
    pub scan_options: ScanOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub results: Option<Vec<ScanResult>>,
    pub error: Option<String>,
}

/// A state transition written through the job store.
#[derive(Debug, Clone, PartialEq)]
pub enum JobUpdate {
    Started { at: DateTime<Utc> },
    Completed { at: DateTime<Utc>, results: Vec<ScanResult> },
    Failed { at: DateTime<Utc>, error: String },
}

impl JobUpdate {
    pub fn target_status(&self) -> JobStatus {
        match self {
            JobUpdate::Started { .. } => JobStatus::InProgress,
            JobUpdate::Completed { .. } => JobStatus::Completed,
            JobUpdate::Failed { .. } => JobStatus::Failed,
        }
    }
}

impl JobRecord {
    pub fn queued(
        target: ResolvedTarget,
        scan_category: ScanCategory,
        scan_options: ScanOptions,
        principal: Option<Principal>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: target.canonical,
            resolved_ip: target.resolved_ip,
            scan_category,
            scan_options,
            principal,
            status: JobStatus::Queued,
            created_at: now,
            started_at: None,
            finished_at: None,
            results: None,
            error: None,
        }
    }

    /// Applies a transition, keeping `results` and `error` mutually exclusive
    /// and only populated on terminal states.
    pub fn apply(&mut self, update: JobUpdate) -> Result<(), TransitionError> {
        let next = update.target_status();
        if !self.status.can_transition_to(next) {
            return Err(TransitionError { from: self.status, to: next });
        }
        match update {
            JobUpdate::Started { at } => {
                self.started_at = Some(at);
            }
            JobUpdate::Completed { at, results } => {
                self.finished_at = Some(at);
                self.results = Some(results);
                self.error = None;
            }
            JobUpdate::Failed { at, error } => {
                self.finished_at = Some(at);
                self.error = Some(error);
                self.results = None;
            }
        }
        self.status = next;
        Ok(())
    }

    pub fn succeeded_count(&self) -> usize {
        self.results
            .as_ref()
            .map_or(0, |r| r.iter().filter(|s| s.succeeded).count())
    }

    pub fn failed_count(&self) -> usize {
        self.results
            .as_ref()
            .map_or(0, |r| r.iter().filter(|s| !s.succeeded).count())
    }
}
