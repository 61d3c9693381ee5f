// src/config.rs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::logging::get_data_dir;

/// Environment prefix, e.g. `VANGUARD__ORCHESTRATOR__MAX_CONCURRENT_JOBS=8`.
pub const ENV_PREFIX: &str = "VANGUARD";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// --- Configurazione dell'Applicazione ---
// Application Configuration

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub orchestrator: OrchestratorConfig,
    pub scanners: ScannersConfig,
    pub storage: StorageConfig,
    pub reports: ReportsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Jobs executing at the same time. Further jobs wait in QUEUED.
    pub max_concurrent_jobs: usize,
    /// External processes running at the same time, across all jobs.
    pub max_concurrent_tools: usize,
    /// Run a job's adapters one after another instead of concurrently.
    pub sequential_adapters: bool,
    pub persist_retries: u32,
    pub persist_retry_delay_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            max_concurrent_tools: 8,
            sequential_adapters: false,
            persist_retries: 3,
            persist_retry_delay_ms: 250,
        }
    }
}

impl OrchestratorConfig {
    pub fn persist_retry_delay(&self) -> Duration {
        Duration::from_millis(self.persist_retry_delay_ms)
    }
}

/// Executable paths and wall-clock budgets of the external tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannersConfig {
    pub nmap_path: String,
    pub sslscan_path: String,
    pub testssl_path: String,
    pub nikto_path: String,
    pub zap_path: String,
    pub nmap_timeout_secs: u64,
    pub sslscan_timeout_secs: u64,
    pub testssl_timeout_secs: u64,
    pub nikto_timeout_secs: u64,
    pub zap_timeout_secs: u64,
}

impl Default for ScannersConfig {
    fn default() -> Self {
        Self {
            nmap_path: "nmap".to_string(),
            sslscan_path: "sslscan".to_string(),
            testssl_path: "testssl.sh".to_string(),
            nikto_path: "nikto".to_string(),
            zap_path: "zap-baseline.py".to_string(),
            nmap_timeout_secs: 300,
            sslscan_timeout_secs: 120,
            testssl_timeout_secs: 180,
            nikto_timeout_secs: 300,
            zap_timeout_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory of the file-backed job store. Defaults to `<data dir>/jobs`.
    pub jobs_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn jobs_dir(&self) -> PathBuf {
        self.jobs_dir.clone().unwrap_or_else(|| get_data_dir().join("jobs"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Scratch directory for tool reports. Defaults to a folder under the system temp dir.
    pub dir: Option<PathBuf>,
    /// Leave report files on disk after they were read.
    pub keep_reports: bool,
    /// Reports older than this are removed at startup.
    pub retention_secs: u64,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            keep_reports: false,
            retention_secs: 3600,
        }
    }
}

impl ReportsConfig {
    pub fn dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("vanguard-scan-results"))
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

impl Config {
    /// Loads defaults, then the optional file, then `VANGUARD__*` variables.
    ///
    /// # Arguments
    ///
    /// * `file` - An optional TOML/YAML/JSON file; the format follows the extension.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.orchestrator.max_concurrent_jobs == 0 {
            return Err(ConfigLoadError::Invalid(
                "orchestrator.max_concurrent_jobs must be at least 1".into(),
            ));
        }
        if self.orchestrator.max_concurrent_tools == 0 {
            return Err(ConfigLoadError::Invalid(
                "orchestrator.max_concurrent_tools must be at least 1".into(),
            ));
        }
        let s = &self.scanners;
        let timeouts = [
            ("nmap", s.nmap_timeout_secs),
            ("sslscan", s.sslscan_timeout_secs),
            ("testssl", s.testssl_timeout_secs),
            ("nikto", s.nikto_timeout_secs),
            ("zap", s.zap_timeout_secs),
        ];
        if let Some((tool, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigLoadError::Invalid(format!(
                "scanners.{tool}_timeout_secs must be greater than zero"
            )));
        }
        let paths = [&s.nmap_path, &s.sslscan_path, &s.testssl_path, &s.nikto_path, &s.zap_path];
        if paths.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigLoadError::Invalid("scanner paths must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert_eq!(config.scanners.zap_timeout_secs, 600);
        assert!(!config.orchestrator.sequential_adapters);
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[orchestrator]\nmax_concurrent_jobs = 2\nsequential_adapters = true\n\n\
             [scanners]\nnmap_path = \"/opt/nmap/bin/nmap\""
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.orchestrator.max_concurrent_jobs, 2);
        assert!(config.orchestrator.sequential_adapters);
        assert_eq!(config.scanners.nmap_path, "/opt/nmap/bin/nmap");
        assert_eq!(config.scanners.sslscan_path, "sslscan");
    }

    #[test]
    fn zero_limits_are_rejected() {
        let mut config = Config::default();
        config.orchestrator.max_concurrent_jobs = 0;
        assert!(matches!(config.validate(), Err(ConfigLoadError::Invalid(_))));

        let mut config = Config::default();
        config.scanners.nikto_timeout_secs = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("nikto_timeout_secs"));
    }
}
