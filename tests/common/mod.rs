// tests/common/mod.rs

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use vanguard_rs_orchestrator::core::dispatch::{AdapterKind, AdapterSet};
use vanguard_rs_orchestrator::core::error::PersistenceError;
use vanguard_rs_orchestrator::core::models::{
    FailureKind, JobId, JobRecord, JobStatus, JobUpdate, ScanOptions, ScanResult,
};
use vanguard_rs_orchestrator::core::orchestrator::{Orchestrator, OrchestratorSettings};
use vanguard_rs_orchestrator::core::scanner::reports::ReportDir;
use vanguard_rs_orchestrator::core::scanner::{ScanContext, ScannerAdapter};
use vanguard_rs_orchestrator::core::store::{JobStore, MemoryJobStore};
use vanguard_rs_orchestrator::core::target::{HostResolver, TargetResolver};

/// DNS stub with a fixed table; unknown names fail like NXDOMAIN.
#[derive(Default)]
pub struct FakeResolver {
    pub table: HashMap<String, Ipv4Addr>,
    pub calls: AtomicUsize,
}

impl FakeResolver {
    pub fn with(mut self, host: &str, ip: Ipv4Addr) -> Self {
        self.table.insert(host.to_string(), ip);
        self
    }
}

#[async_trait]
impl HostResolver for FakeResolver {
    async fn lookup_ipv4(&self, host: &str) -> Result<Ipv4Addr, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table
            .get(host)
            .copied()
            .ok_or_else(|| format!("no record found for {host}"))
    }
}

pub fn scanner_name(kind: AdapterKind) -> &'static str {
    match kind {
        AdapterKind::HostDiscovery => "host-discovery",
        AdapterKind::HostDiscoveryComprehensive => "host-discovery-comprehensive",
        AdapterKind::NetworkFingerprint => "network-fingerprint",
        AdapterKind::TlsLightweight => "tls-lightweight",
        AdapterKind::TlsComprehensive => "tls-comprehensive",
        AdapterKind::WebSurface => "web-surface",
        AdapterKind::WebAttackSimulation => "web-attack-simulation",
    }
}

/// Scripted adapter. With a gate it blocks until a permit is added or the
/// job is cancelled.
pub struct FakeAdapter {
    pub name: &'static str,
    pub delay: Duration,
    pub gate: Option<Arc<Semaphore>>,
    pub panic: bool,
}

impl FakeAdapter {
    pub fn new(kind: AdapterKind) -> Self {
        Self {
            name: scanner_name(kind),
            delay: Duration::from_millis(10),
            gate: None,
            panic: false,
        }
    }
}

#[async_trait]
impl ScannerAdapter for FakeAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, target: Ipv4Addr, _options: &ScanOptions, ctx: &ScanContext) -> ScanResult {
        if let Some(gate) = &self.gate {
            tokio::select! {
                permit = gate.acquire() => permit.expect("gate closed").forget(),
                _ = ctx.cancel.cancelled() => {
                    return ScanResult::failure(
                        self.name,
                        0,
                        FailureKind::Cancelled,
                        "cancelled before completion".into(),
                        String::new(),
                    );
                }
            }
        }
        tokio::time::sleep(self.delay).await;
        if self.panic {
            panic!("{} blew up", self.name);
        }
        ScanResult::success(
            self.name,
            self.delay.as_millis() as u64,
            format!("<report target=\"{target}\"/>"),
            String::new(),
        )
    }
}

/// Adapter set where every kind is a default `FakeAdapter` unless overridden.
#[derive(Default)]
pub struct FakeAdapters {
    overrides: HashMap<AdapterKind, Arc<dyn ScannerAdapter>>,
}

impl FakeAdapters {
    pub fn with(mut self, kind: AdapterKind, adapter: impl ScannerAdapter + 'static) -> Self {
        self.overrides.insert(kind, Arc::new(adapter));
        self
    }
}

impl AdapterSet for FakeAdapters {
    fn adapter(&self, kind: AdapterKind) -> Arc<dyn ScannerAdapter> {
        self.overrides
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Arc::new(FakeAdapter::new(kind)) as Arc<dyn ScannerAdapter>)
    }
}

/// Memory store that fails writes on demand.
///
/// `fail_updates` rejects a transition before it is applied; `lose_acks`
/// applies it and still reports an I/O error, like a write whose reply got lost.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryJobStore,
    fail_create: AtomicBool,
    failing_updates: Mutex<HashMap<JobStatus, usize>>,
    lost_acks: Mutex<HashMap<JobStatus, usize>>,
    pub update_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn fail_create(self) -> Self {
        self.fail_create.store(true, Ordering::SeqCst);
        self
    }

    /// `usize::MAX` fails every attempt.
    pub fn fail_updates(self, status: JobStatus, times: usize) -> Self {
        self.failing_updates.lock().unwrap().insert(status, times);
        self
    }

    pub fn lose_acks(self, status: JobStatus, times: usize) -> Self {
        self.lost_acks.lock().unwrap().insert(status, times);
        self
    }
}

fn disk_error() -> PersistenceError {
    PersistenceError::Io(std::io::Error::other("disk unavailable"))
}

fn take_one(counters: &Mutex<HashMap<JobStatus, usize>>, status: JobStatus) -> bool {
    let mut counters = counters.lock().unwrap();
    match counters.get_mut(&status) {
        Some(remaining) if *remaining > 0 => {
            if *remaining != usize::MAX {
                *remaining -= 1;
            }
            true
        }
        _ => false,
    }
}

#[async_trait]
impl JobStore for FlakyStore {
    async fn create(&self, record: &JobRecord) -> Result<JobId, PersistenceError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(disk_error());
        }
        self.inner.create(record).await
    }

    async fn get(&self, id: JobId) -> Result<Option<JobRecord>, PersistenceError> {
        self.inner.get(id).await
    }

    async fn update(&self, id: JobId, update: JobUpdate) -> Result<JobRecord, PersistenceError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let status = update.target_status();
        if take_one(&self.failing_updates, status) {
            return Err(disk_error());
        }
        let record = self.inner.update(id, update).await?;
        if take_one(&self.lost_acks, status) {
            return Err(disk_error());
        }
        Ok(record)
    }

    async fn list_unfinished(&self) -> Result<Vec<JobRecord>, PersistenceError> {
        self.inner.list_unfinished().await
    }
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub store: Arc<dyn JobStore>,
    pub resolver: Arc<FakeResolver>,
    pub reports: TempDir,
}

pub fn harness(adapters: FakeAdapters, settings: OrchestratorSettings) -> Harness {
    harness_with_store(adapters, settings, Arc::new(MemoryJobStore::new()))
}

pub fn harness_with_store(
    adapters: FakeAdapters,
    settings: OrchestratorSettings,
    store: Arc<dyn JobStore>,
) -> Harness {
    let resolver =
        Arc::new(FakeResolver::default().with("example.com", Ipv4Addr::new(93, 184, 216, 34)));
    let reports = tempfile::tempdir().expect("tempdir");
    let orchestrator = Orchestrator::new(
        TargetResolver::new(resolver.clone()),
        Arc::clone(&store),
        Arc::new(adapters),
        ReportDir::new(reports.path(), false),
        settings,
    );
    Harness {
        orchestrator,
        store,
        resolver,
        reports,
    }
}

pub fn fast_settings() -> OrchestratorSettings {
    OrchestratorSettings {
        persist_retry_delay: Duration::from_millis(5),
        ..OrchestratorSettings::default()
    }
}

/// Polls until the job reaches COMPLETED or FAILED.
pub async fn wait_terminal(orchestrator: &Orchestrator, id: JobId) -> JobRecord {
    for _ in 0..500 {
        let record = orchestrator.get_status(id).await.expect("job exists");
        if record.status.is_terminal() {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} did not finish in time");
}
