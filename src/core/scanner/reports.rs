// src/core/scanner/reports.rs

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::core::models::JobId;

/// Contents of a report artifact, cut at the tool's output ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub text: String,
    pub truncated: bool,
}

/// Directory where tools drop their report artifacts.
#[derive(Debug, Clone)]
pub struct ReportDir {
    root: PathBuf,
    keep_reports: bool,
}

impl ReportDir {
    pub fn new(root: impl Into<PathBuf>, keep_reports: bool) -> Self {
        Self {
            root: root.into(),
            keep_reports,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        debug!(dir = %self.root.display(), "Report directory ready.");
        Ok(())
    }

    /// One artifact per job and scanner.
    pub fn path_for(&self, job_id: JobId, scanner: &str, extension: &str) -> PathBuf {
        self.root.join(format!("{scanner}-{job_id}.{extension}"))
    }

    /// Removes a stale artifact so a previous run can never be mistaken for this one.
    pub async fn clear(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Could not remove stale report.");
            }
        }
    }

    /// Reads at most `limit` bytes of the artifact, then deletes it unless
    /// reports are kept.
    pub async fn take(&self, path: &Path, limit: usize) -> Option<Report> {
        let content = match read_bounded(path, limit).await {
            Ok(report) => {
                if report.truncated {
                    warn!(path = %path.display(), limit, "Report truncated at the output ceiling.");
                }
                Some(report)
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No report artifact.");
                None
            }
        };
        if content.is_some() && !self.keep_reports {
            self.clear(path).await;
        }
        content
    }

    /// Deletes artifacts older than `older_than`. Returns how many were removed.
    pub async fn cleanup(&self, older_than: Duration) -> std::io::Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        let now = SystemTime::now();
        let mut deleted = 0;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age > older_than {
                tokio::fs::remove_file(entry.path()).await?;
                deleted += 1;
            }
        }
        info!(deleted, dir = %self.root.display(), "Cleaned up old report files.");
        Ok(deleted)
    }
}

async fn read_bounded(path: &Path, limit: usize) -> std::io::Result<Report> {
    let file = tokio::fs::File::open(path).await?;
    let mut bytes = Vec::new();
    file.take(limit as u64 + 1).read_to_end(&mut bytes).await?;
    let truncated = bytes.len() > limit;
    bytes.truncate(limit);
    Ok(Report {
        text: String::from_utf8_lossy(&bytes).into_owned(),
        truncated,
    })
}
