// src/core/orchestrator.rs

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, error, info, info_span, warn};

use crate::config::OrchestratorConfig;
use crate::core::dispatch::{AdapterSet, run_adapters};
use crate::core::error::{OrchestrationError, PersistenceError, StatusError, SubmitError};
use crate::core::models::{
    JobId, JobRecord, JobStatus, JobUpdate, Principal, ScanCategory, ScanOptions,
};
use crate::core::scanner::ScanContext;
use crate::core::scanner::reports::ReportDir;
use crate::core::store::JobStore;
use crate::core::target::TargetResolver;

/// Tuning knobs of the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub max_concurrent_jobs: usize,
    pub max_concurrent_tools: usize,
    pub sequential_adapters: bool,
    pub persist_retries: u32,
    pub persist_retry_delay: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&OrchestratorConfig::default())
    }
}

impl From<&OrchestratorConfig> for OrchestratorSettings {
    fn from(config: &OrchestratorConfig) -> Self {
        Self {
            max_concurrent_jobs: config.max_concurrent_jobs.max(1),
            max_concurrent_tools: config.max_concurrent_tools.max(1),
            sequential_adapters: config.sequential_adapters,
            persist_retries: config.persist_retries,
            persist_retry_delay: config.persist_retry_delay(),
        }
    }
}

/// A caller's scan request, after category and options were parsed.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    pub target: String,
    pub category: ScanCategory,
    pub options: ScanOptions,
}

/// Returned by `submit` before any scanning happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Admission {
    pub job_id: JobId,
    pub status: JobStatus,
    pub target: String,
}

struct Inner {
    resolver: TargetResolver,
    store: Arc<dyn JobStore>,
    adapters: Arc<dyn AdapterSet>,
    reports: ReportDir,
    job_permits: Arc<Semaphore>,
    tool_permits: Arc<Semaphore>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    settings: OrchestratorSettings,
}

/// Admits scan requests, runs them in the background and answers status reads.
///
/// Cheap to clone; all clones share the same worker pool and store.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        resolver: TargetResolver,
        store: Arc<dyn JobStore>,
        adapters: Arc<dyn AdapterSet>,
        reports: ReportDir,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                resolver,
                store,
                adapters,
                reports,
                job_permits: Arc::new(Semaphore::new(settings.max_concurrent_jobs)),
                tool_permits: Arc::new(Semaphore::new(settings.max_concurrent_tools)),
                cancel: CancellationToken::new(),
                tracker: TaskTracker::new(),
                settings,
            }),
        }
    }

    // --- Ammissione ---
    // Admission

    /// Validates and resolves the target, persists a QUEUED job and starts it
    /// in the background.
    ///
    /// # Arguments
    ///
    /// * `request` - Target, category and options of the scan.
    /// * `principal` - Opaque caller identity, stored on the record as-is.
    ///
    /// # Returns
    ///
    /// The admission receipt, or the reason nothing was created.
    pub async fn submit(
        &self,
        request: SubmitRequest,
        principal: Option<Principal>,
    ) -> Result<Admission, SubmitError> {
        let resolved = self.inner.resolver.resolve(&request.target).await?;
        let record =
            JobRecord::queued(resolved, request.category, request.options, principal, Utc::now());

        self.inner.store.create(&record).await?;
        info!(
            job_id = %record.id,
            host = %record.target,
            ip = %record.resolved_ip,
            category = %record.scan_category,
            "Scan job queued."
        );

        let admission = Admission {
            job_id: record.id,
            status: record.status,
            target: record.target.clone(),
        };

        let span = info_span!("job", job_id = %record.id);
        let this = self.clone();
        self.inner.tracker.spawn(async move { this.execute(record).await }.instrument(span));
        Ok(admission)
    }

    // --- Esecuzione ---
    // Execution

    async fn execute(&self, record: JobRecord) {
        let inner = &self.inner;
        let id = record.id;

        let _permit = tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => {
                self.abandon(id, OrchestrationError::ShutDown).await;
                return;
            }
            permit = inner.job_permits.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    self.abandon(id, OrchestrationError::ShutDown).await;
                    return;
                }
            },
        };

        if let Err(e) = self.persist(id, JobUpdate::Started { at: Utc::now() }).await {
            self.fail(id, format!("failed to start job: {e}")).await;
            return;
        }
        info!("Scan job started.");

        let ctx = ScanContext {
            job_id: id,
            cancel: inner.cancel.child_token(),
            tool_permits: Arc::clone(&inner.tool_permits),
            reports: inner.reports.clone(),
        };
        let outcome = run_adapters(
            inner.adapters.as_ref(),
            record.scan_category,
            record.resolved_ip,
            &record.scan_options,
            &ctx,
            inner.settings.sequential_adapters,
        )
        .await;

        let update = match outcome {
            Ok(results) => {
                let failed = results.iter().filter(|r| !r.succeeded).count();
                info!(adapters = results.len(), failed, "Scan job completed.");
                JobUpdate::Completed { at: Utc::now(), results }
            }
            Err(e) => {
                error!(error = %e, "Scan job failed.");
                JobUpdate::Failed { at: Utc::now(), error: e.to_string() }
            }
        };

        if let Err(e) = self.persist(id, update).await {
            self.fail(id, format!("failed to store results: {e}")).await;
        }
    }

    async fn abandon(&self, id: JobId, reason: OrchestrationError) {
        warn!(job_id = %id, reason = %reason, "Scan job abandoned.");
        self.fail(id, reason.to_string()).await;
    }

    /// Last-resort FAILED write so a job never stays QUEUED or IN_PROGRESS
    /// without an explanation.
    async fn fail(&self, id: JobId, error: String) {
        let update = JobUpdate::Failed { at: Utc::now(), error };
        if let Err(e) = self.persist(id, update).await {
            error!(job_id = %id, error = %e, "Job could not be marked as failed.");
        }
    }

    /// Writes a transition, retrying transient store failures.
    async fn persist(&self, id: JobId, update: JobUpdate) -> Result<JobRecord, PersistenceError> {
        let settings = &self.inner.settings;
        let target = update.target_status();
        let mut attempt: u32 = 0;
        loop {
            let err = match self.inner.store.update(id, update.clone()).await {
                Ok(record) => return Ok(record),
                Err(e) => e,
            };

            // An earlier attempt may have landed even though it reported an error.
            if attempt > 0 && matches!(err, PersistenceError::InvalidTransition { .. }) {
                if let Ok(Some(record)) = self.inner.store.get(id).await {
                    if record.status == target {
                        return Ok(record);
                    }
                }
            }

            if !err.is_retryable() || attempt >= settings.persist_retries {
                error!(
                    job_id = %id,
                    status = %target,
                    error = %err,
                    attempts = attempt + 1,
                    "Failed to persist job update."
                );
                return Err(err);
            }
            attempt += 1;
            warn!(job_id = %id, status = %target, error = %err, attempt, "Retrying job update.");
            tokio::time::sleep(settings.persist_retry_delay * attempt).await;
        }
    }

    // --- Stato ---
    // Status

    /// Current snapshot of a job. Never mutates anything.
    pub async fn get_status(&self, id: JobId) -> Result<JobRecord, StatusError> {
        self.inner.store.get(id).await?.ok_or(StatusError::NotFound(id))
    }

    // --- Ciclo di Vita ---
    // Lifecycle

    /// Marks jobs left QUEUED or IN_PROGRESS by a previous process as FAILED.
    /// Must run before the first `submit`.
    pub async fn recover_interrupted(&self) -> Result<usize, PersistenceError> {
        let stale = self.inner.store.list_unfinished().await?;
        let mut recovered = 0;
        for record in stale {
            let update = JobUpdate::Failed {
                at: Utc::now(),
                error: OrchestrationError::Interrupted.to_string(),
            };
            match self.persist(record.id, update).await {
                Ok(_) => recovered += 1,
                Err(e) => {
                    warn!(job_id = %record.id, error = %e, "Could not recover interrupted job.");
                }
            }
        }
        if recovered > 0 {
            info!(recovered, "Marked interrupted jobs as failed.");
        }
        Ok(recovered)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Cancels running adapters, fails queued jobs and waits for job tasks to
    /// settle. Returns `false` if `grace` elapsed first.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        info!("Shutting down orchestrator.");
        self.inner.cancel.cancel();
        self.inner.tracker.close();
        match tokio::time::timeout(grace, self.inner.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(remaining = self.inner.tracker.len(), "Shutdown grace period elapsed.");
                false
            }
        }
    }
}
