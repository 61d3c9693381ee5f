// src/core/scanner/availability.rs

use serde::Serialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ScannersConfig;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Whether one external tool can be launched, and which version it reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAvailability {
    pub tool: &'static str,
    pub program: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Probes every configured tool with its version flag.
pub async fn check_scanners(config: &ScannersConfig) -> Vec<ToolAvailability> {
    let probes = [
        ("nmap", config.nmap_path.as_str(), "--version"),
        ("sslscan", config.sslscan_path.as_str(), "--version"),
        ("testssl", config.testssl_path.as_str(), "--version"),
        ("nikto", config.nikto_path.as_str(), "-Version"),
        ("zap", config.zap_path.as_str(), "--version"),
    ];

    let checks = probes.map(|(tool, program, flag)| probe(tool, program, flag));
    let [a, b, c, d, e] = checks;
    let (a, b, c, d, e) = tokio::join!(a, b, c, d, e);
    vec![a, b, c, d, e]
}

async fn probe(tool: &'static str, program: &str, flag: &str) -> ToolAvailability {
    let mut availability = ToolAvailability {
        tool,
        program: program.to_string(),
        available: false,
        version: None,
        error: None,
    };

    let output = Command::new(program)
        .arg(flag)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    match timeout(PROBE_TIMEOUT, output).await {
        Ok(Ok(out)) => {
            // Some tools print the banner on stderr and exit non-zero for `--version`.
            let text = if out.stdout.is_empty() { out.stderr } else { out.stdout };
            availability.available = true;
            availability.version = String::from_utf8_lossy(&text)
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(str::to_string);
            debug!(tool, version = ?availability.version, "Scanner available.");
        }
        Ok(Err(e)) => {
            warn!(tool, program, error = %e, "Scanner not available.");
            availability.error = Some(e.to_string());
        }
        Err(_) => {
            warn!(tool, program, "Scanner version probe timed out.");
            let secs = PROBE_TIMEOUT.as_secs();
            availability.error = Some(format!("version probe timed out after {secs}s"));
        }
    }
    availability
}
