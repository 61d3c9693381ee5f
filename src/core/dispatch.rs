// src/core/dispatch.rs

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumIter};
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::ScannersConfig;
use crate::core::error::OrchestrationError;
use crate::core::models::{ScanCategory, ScanOptions, ScanResult};
use crate::core::scanner::nikto::Nikto;
use crate::core::scanner::nmap::{Nmap, NmapProfile};
use crate::core::scanner::sslscan::SslScan;
use crate::core::scanner::testssl::TestSsl;
use crate::core::scanner::zap::Zap;
use crate::core::scanner::{ScanContext, ScannerAdapter, ToolAdapter};

/// The fixed set of adapters a category can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum AdapterKind {
    HostDiscovery,
    HostDiscoveryComprehensive,
    NetworkFingerprint,
    TlsLightweight,
    TlsComprehensive,
    WebSurface,
    WebAttackSimulation,
}

/// The dispatch matrix. Order here is the order of `results`.
pub fn adapters_for(category: ScanCategory) -> &'static [AdapterKind] {
    use AdapterKind::*;
    match category {
        ScanCategory::Quick => &[HostDiscovery],
        ScanCategory::Full => &[HostDiscoveryComprehensive, TlsLightweight, WebSurface],
        ScanCategory::Network => &[NetworkFingerprint],
        ScanCategory::Web => &[WebSurface, WebAttackSimulation],
        ScanCategory::Ssl => &[TlsLightweight, TlsComprehensive],
    }
}

/// Source of adapter instances. Tests substitute fakes here.
pub trait AdapterSet: Send + Sync {
    fn adapter(&self, kind: AdapterKind) -> Arc<dyn ScannerAdapter>;
}

/// The production adapters, built once from configuration.
pub struct ToolAdapters {
    host_discovery: Arc<dyn ScannerAdapter>,
    host_discovery_comprehensive: Arc<dyn ScannerAdapter>,
    network_fingerprint: Arc<dyn ScannerAdapter>,
    tls_lightweight: Arc<dyn ScannerAdapter>,
    tls_comprehensive: Arc<dyn ScannerAdapter>,
    web_surface: Arc<dyn ScannerAdapter>,
    web_attack_simulation: Arc<dyn ScannerAdapter>,
}

impl ToolAdapters {
    pub fn from_config(config: &ScannersConfig) -> Self {
        let secs = Duration::from_secs;
        let nmap = |profile| -> Arc<dyn ScannerAdapter> {
            let timeout = secs(config.nmap_timeout_secs);
            Arc::new(ToolAdapter::new(Nmap::new(profile, &config.nmap_path, timeout)))
        };
        Self {
            host_discovery: nmap(NmapProfile::Quick),
            host_discovery_comprehensive: nmap(NmapProfile::Comprehensive),
            network_fingerprint: nmap(NmapProfile::Network),
            tls_lightweight: Arc::new(ToolAdapter::new(SslScan::new(
                &config.sslscan_path,
                secs(config.sslscan_timeout_secs),
            ))),
            tls_comprehensive: Arc::new(ToolAdapter::new(TestSsl::new(
                &config.testssl_path,
                secs(config.testssl_timeout_secs),
            ))),
            web_surface: Arc::new(ToolAdapter::new(Nikto::new(
                &config.nikto_path,
                secs(config.nikto_timeout_secs),
            ))),
            web_attack_simulation: Arc::new(ToolAdapter::new(Zap::new(
                &config.zap_path,
                secs(config.zap_timeout_secs),
            ))),
        }
    }
}

impl AdapterSet for ToolAdapters {
    fn adapter(&self, kind: AdapterKind) -> Arc<dyn ScannerAdapter> {
        let adapter = match kind {
            AdapterKind::HostDiscovery => &self.host_discovery,
            AdapterKind::HostDiscoveryComprehensive => &self.host_discovery_comprehensive,
            AdapterKind::NetworkFingerprint => &self.network_fingerprint,
            AdapterKind::TlsLightweight => &self.tls_lightweight,
            AdapterKind::TlsComprehensive => &self.tls_comprehensive,
            AdapterKind::WebSurface => &self.web_surface,
            AdapterKind::WebAttackSimulation => &self.web_attack_simulation,
        };
        Arc::clone(adapter)
    }
}

/// Runs every adapter selected by `category` and returns one result per
/// adapter, in matrix order.
///
/// Adapter-level failures are already inside the results. An error here means
/// an adapter task panicked or vanished, which fails the whole job.
pub async fn run_adapters(
    adapters: &dyn AdapterSet,
    category: ScanCategory,
    target: Ipv4Addr,
    options: &ScanOptions,
    ctx: &ScanContext,
    sequential: bool,
) -> Result<Vec<ScanResult>, OrchestrationError> {
    let kinds = adapters_for(category);
    info!(
        job_id = %ctx.job_id,
        %category,
        adapters = kinds.len(),
        sequential,
        "Dispatching adapters."
    );

    if sequential {
        let mut results = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let adapter = adapters.adapter(*kind);
            let ctx = ctx.clone();
            let options = options.clone();
            // Spawned so that a panicking adapter surfaces as a JoinError.
            let handle = tokio::spawn(async move { adapter.run(target, &options, &ctx).await });
            let result = handle.await.map_err(|e| aborted(*kind, e))?;
            results.push(result);
        }
        return Ok(results);
    }

    let mut set = JoinSet::new();
    let mut running = Vec::with_capacity(kinds.len());
    for (index, kind) in kinds.iter().copied().enumerate() {
        let adapter = adapters.adapter(kind);
        let ctx = ctx.clone();
        let options = options.clone();
        // Inner task per adapter, so a panic can be attributed to its slot.
        let handle = tokio::spawn(async move { adapter.run(target, &options, &ctx).await });
        running.push(handle.abort_handle());
        set.spawn(async move { (index, handle.await) });
    }

    let mut slots: Vec<Option<ScanResult>> = vec![None; kinds.len()];
    while let Some(joined) = set.join_next().await {
        let failure = match joined {
            Ok((index, Ok(result))) => {
                slots[index] = Some(result);
                continue;
            }
            Ok((index, Err(e))) => {
                error!(
                    job_id = %ctx.job_id,
                    scanner = %kinds[index],
                    error = %e,
                    "Adapter task failed."
                );
                aborted(kinds[index], e)
            }
            Err(e) => OrchestrationError::AdapterAborted {
                scanner: "dispatcher".to_string(),
                cause: e.to_string(),
            },
        };
        // The job is lost; siblings must not keep their processes and tool permits.
        for handle in &running {
            handle.abort();
        }
        return Err(failure);
    }

    slots
        .into_iter()
        .zip(kinds)
        .map(|(slot, kind)| slot.ok_or_else(|| OrchestrationError::MissingResult(kind.to_string())))
        .collect()
}

fn aborted(kind: AdapterKind, e: tokio::task::JoinError) -> OrchestrationError {
    OrchestrationError::AdapterAborted {
        scanner: kind.to_string(),
        cause: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::reports::ReportDir;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use strum::IntoEnumIterator;
    use tokio::sync::Semaphore;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    struct Named {
        name: &'static str,
        delay: Duration,
        panic: bool,
    }

    #[async_trait]
    impl ScannerAdapter for Named {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, _: Ipv4Addr, _: &ScanOptions, _: &ScanContext) -> ScanResult {
            tokio::time::sleep(self.delay).await;
            if self.panic {
                panic!("adapter bug");
            }
            let elapsed = self.delay.as_millis() as u64;
            ScanResult::success(self.name, elapsed, "ok".into(), String::new())
        }
    }

    /// Earlier adapters in the matrix sleep longer, so completion order is reversed.
    struct Reversed {
        panic_on: Option<AdapterKind>,
    }

    impl AdapterSet for Reversed {
        fn adapter(&self, kind: AdapterKind) -> Arc<dyn ScannerAdapter> {
            let position = AdapterKind::iter().position(|k| k == kind).unwrap() as u64;
            let name: &'static str = Box::leak(kind.to_string().into_boxed_str());
            Arc::new(Named {
                name,
                delay: Duration::from_millis(80 - position * 10),
                panic: self.panic_on == Some(kind),
            })
        }
    }

    /// `web-surface` panics while `web-attack-simulation` is still running.
    struct PanicBesideSlowSibling {
        sibling_finished: Arc<AtomicBool>,
    }

    struct Slow {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ScannerAdapter for Slow {
        fn name(&self) -> &'static str {
            "web-attack-simulation"
        }

        async fn run(&self, _: Ipv4Addr, _: &ScanOptions, _: &ScanContext) -> ScanResult {
            tokio::time::sleep(Duration::from_millis(300)).await;
            self.finished.store(true, Ordering::SeqCst);
            ScanResult::success(self.name(), 300, "ok".into(), String::new())
        }
    }

    impl AdapterSet for PanicBesideSlowSibling {
        fn adapter(&self, kind: AdapterKind) -> Arc<dyn ScannerAdapter> {
            match kind {
                AdapterKind::WebAttackSimulation => Arc::new(Slow {
                    finished: Arc::clone(&self.sibling_finished),
                }),
                _ => Arc::new(Named {
                    name: "web-surface",
                    delay: Duration::from_millis(10),
                    panic: true,
                }),
            }
        }
    }

    fn ctx() -> ScanContext {
        ScanContext {
            job_id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            tool_permits: Arc::new(Semaphore::new(4)),
            reports: ReportDir::new(std::env::temp_dir(), false),
        }
    }

    #[test]
    fn matrix_is_fixed() {
        assert_eq!(adapters_for(ScanCategory::Quick), &[AdapterKind::HostDiscovery]);
        assert_eq!(
            adapters_for(ScanCategory::Full),
            &[
                AdapterKind::HostDiscoveryComprehensive,
                AdapterKind::TlsLightweight,
                AdapterKind::WebSurface
            ]
        );
        assert_eq!(adapters_for(ScanCategory::Network), &[AdapterKind::NetworkFingerprint]);
        assert_eq!(
            adapters_for(ScanCategory::Web),
            &[AdapterKind::WebSurface, AdapterKind::WebAttackSimulation]
        );
        assert_eq!(
            adapters_for(ScanCategory::Ssl),
            &[AdapterKind::TlsLightweight, AdapterKind::TlsComprehensive]
        );
        for category in ScanCategory::iter() {
            assert!(!adapters_for(category).is_empty());
        }
    }

    #[test]
    fn kinds_match_production_adapter_names() {
        let adapters = ToolAdapters::from_config(&ScannersConfig::default());
        for kind in AdapterKind::iter() {
            assert_eq!(adapters.adapter(kind).name(), kind.to_string());
        }
    }

    #[tokio::test]
    async fn concurrent_results_keep_matrix_order() {
        let results = run_adapters(
            &Reversed { panic_on: None },
            ScanCategory::Full,
            Ipv4Addr::LOCALHOST,
            &ScanOptions::new(),
            &ctx(),
            false,
        )
        .await
        .unwrap();
        let names: Vec<_> = results.iter().map(|r| r.scanner_name.as_str()).collect();
        assert_eq!(names, ["host-discovery-comprehensive", "tls-lightweight", "web-surface"]);
    }

    #[tokio::test]
    async fn sequential_mode_yields_the_same_shape() {
        let results = run_adapters(
            &Reversed { panic_on: None },
            ScanCategory::Ssl,
            Ipv4Addr::LOCALHOST,
            &ScanOptions::new(),
            &ctx(),
            true,
        )
        .await
        .unwrap();
        let names: Vec<_> = results.iter().map(|r| r.scanner_name.as_str()).collect();
        assert_eq!(names, ["tls-lightweight", "tls-comprehensive"]);
    }

    #[tokio::test]
    async fn panicking_adapter_is_an_orchestration_error() {
        for sequential in [false, true] {
            let err = run_adapters(
                &Reversed { panic_on: Some(AdapterKind::WebAttackSimulation) },
                ScanCategory::Web,
                Ipv4Addr::LOCALHOST,
                &ScanOptions::new(),
                &ctx(),
                sequential,
            )
            .await
            .unwrap_err();
            assert!(matches!(err, OrchestrationError::AdapterAborted { .. }));
        }
    }

    #[tokio::test]
    async fn panic_stops_sibling_adapters() {
        let sibling_finished = Arc::new(AtomicBool::new(false));
        let adapters = PanicBesideSlowSibling {
            sibling_finished: Arc::clone(&sibling_finished),
        };

        let err = run_adapters(
            &adapters,
            ScanCategory::Web,
            Ipv4Addr::LOCALHOST,
            &ScanOptions::new(),
            &ctx(),
            false,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            OrchestrationError::AdapterAborted { ref scanner, .. } if scanner == "web-surface"
        ));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!sibling_finished.load(Ordering::SeqCst));
    }
}
