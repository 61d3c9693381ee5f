// src/bootstrap.rs

use color_eyre::eyre::{Result, WrapErr};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::dispatch::ToolAdapters;
use crate::core::orchestrator::{Orchestrator, OrchestratorSettings};
use crate::core::scanner::reports::ReportDir;
use crate::core::store::{FileJobStore, JobStore, MemoryJobStore};
use crate::core::target::{DnsHostResolver, TargetResolver};

/// Wires the production orchestrator from configuration.
///
/// Prepares the report directory, sweeps stale reports, opens the job store
/// and fails jobs interrupted by a previous run.
///
/// # Arguments
///
/// * `config` - Loaded application configuration.
/// * `ephemeral` - Keep job records in memory only.
pub async fn build_orchestrator(config: &Config, ephemeral: bool) -> Result<Orchestrator> {
    let reports = ReportDir::new(config.reports.dir(), config.reports.keep_reports);
    reports
        .ensure()
        .await
        .wrap_err_with(|| format!("cannot create report directory {}", reports.root().display()))?;
    match reports.cleanup(config.reports.retention()).await {
        Ok(0) => {}
        Ok(removed) => info!(removed, "Removed stale scanner reports."),
        Err(e) => warn!(error = %e, "Report cleanup failed."),
    }

    let store: Arc<dyn JobStore> = if ephemeral {
        info!("Using in-memory job store.");
        Arc::new(MemoryJobStore::new())
    } else {
        let dir = config.storage.jobs_dir();
        info!(dir = %dir.display(), "Using file job store.");
        Arc::new(
            FileJobStore::open(&dir)
                .await
                .wrap_err_with(|| format!("cannot open job store at {}", dir.display()))?,
        )
    };

    let orchestrator = Orchestrator::new(
        TargetResolver::new(Arc::new(DnsHostResolver::new())),
        store,
        Arc::new(ToolAdapters::from_config(&config.scanners)),
        reports,
        OrchestratorSettings::from(&config.orchestrator),
    );
    orchestrator
        .recover_interrupted()
        .await
        .wrap_err("failed to recover interrupted jobs")?;
    Ok(orchestrator)
}
