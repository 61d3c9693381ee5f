// src/core/scanner/mod.rs

// This file acts as the public interface for the `scanner` module.
// Each external tool lives in its own file; the process runner, the exit-code
// policy and the report directory are shared by all of them.
pub mod availability;
pub mod nikto;
pub mod nmap;
pub mod policy;
pub mod process;
pub mod reports;
pub mod sslscan;
pub mod testssl;
pub mod zap;

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::error::AdapterFailure;
use crate::core::models::{JobId, ScanOptions, ScanResult};
use self::policy::{apply_tie_break, not_run};
use self::process::{ToolInvocation, run_process};
use self::reports::ReportDir;

pub const MIB: usize = 1024 * 1024;

/// Per-job execution context handed to every adapter.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub job_id: JobId,
    pub cancel: CancellationToken,
    /// Global limit on simultaneously running external processes.
    pub tool_permits: Arc<Semaphore>,
    pub reports: ReportDir,
}

/// One security tool wrapped behind a uniform contract.
///
/// Implementations never fail: every failure mode ends up in the returned
/// `ScanResult`.
#[async_trait]
pub trait ScannerAdapter: Send + Sync {
    /// Stable name reported as `scannerName`.
    fn name(&self) -> &'static str;

    async fn run(&self, target: Ipv4Addr, options: &ScanOptions, ctx: &ScanContext) -> ScanResult;
}

/// Description of a command-line scanner: how to invoke it and what budget it gets.
pub trait ExternalTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn program(&self) -> &str;

    /// Extension of the structured report the tool writes.
    fn report_extension(&self) -> &'static str;

    fn timeout(&self) -> Duration;

    fn output_limit(&self) -> usize;

    /// Builds the argument list. Options the tool does not know are ignored.
    fn build_args(&self, target: Ipv4Addr, options: &ScanOptions, report: &Path) -> Vec<String>;
}

/// Runs an `ExternalTool` as a child process and applies the tie-break policy.
pub struct ToolAdapter<T> {
    tool: T,
}

impl<T: ExternalTool> ToolAdapter<T> {
    pub fn new(tool: T) -> Self {
        Self { tool }
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }
}

#[async_trait]
impl<T: ExternalTool + 'static> ScannerAdapter for ToolAdapter<T> {
    fn name(&self) -> &'static str {
        self.tool.name()
    }

    async fn run(&self, target: Ipv4Addr, options: &ScanOptions, ctx: &ScanContext) -> ScanResult {
        let scanner = self.tool.name();
        let report_path = ctx.reports.path_for(ctx.job_id, scanner, self.tool.report_extension());
        ctx.reports.clear(&report_path).await;

        let invocation = ToolInvocation {
            program: self.tool.program().to_string(),
            args: self.tool.build_args(target, options, &report_path),
            report_path: report_path.clone(),
            timeout: self.tool.timeout(),
            output_limit: self.tool.output_limit(),
        };

        let _permit = tokio::select! {
            _ = ctx.cancel.cancelled() => return not_run(scanner, AdapterFailure::Cancelled),
            permit = ctx.tool_permits.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return not_run(scanner, AdapterFailure::Cancelled),
            },
        };

        info!(
            job_id = %ctx.job_id,
            scanner,
            command = %invocation.command_line(),
            "Starting scanner."
        );
        let run = match run_process(&invocation, &ctx.cancel).await {
            Ok(run) => run,
            Err(failure) => return not_run(scanner, failure),
        };

        let report = ctx.reports.take(&report_path, self.tool.output_limit()).await;
        let result = apply_tie_break(scanner, self.tool.program(), &run, report);
        info!(
            job_id = %ctx.job_id,
            scanner,
            succeeded = result.succeeded,
            duration_ms = result.duration_ms,
            "Scanner finished."
        );
        result
    }
}
