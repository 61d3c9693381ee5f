// src/core/scanner/nmap.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::core::models::ScanOptions;
use crate::core::scanner::{ExternalTool, MIB};

/// Port specs such as `22,80,443` or `1-1024`.
static RE_PORT_SPEC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{1,5}(-[0-9]{1,5})?(,[0-9]{1,5}(-[0-9]{1,5})?)*$").unwrap());

/// Which flavour of host/service discovery to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NmapProfile {
    /// Service detection on the top 1000 ports.
    Quick,
    /// All 65535 ports plus default scripts.
    Comprehensive,
    /// OS and version fingerprinting.
    Network,
}

/// Host/service discovery through nmap, with an XML report.
#[derive(Debug, Clone)]
pub struct Nmap {
    profile: NmapProfile,
    program: String,
    timeout: Duration,
}

impl Nmap {
    pub fn new(profile: NmapProfile, program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            profile,
            program: program.into(),
            timeout,
        }
    }
}

impl ExternalTool for Nmap {
    fn name(&self) -> &'static str {
        match self.profile {
            NmapProfile::Quick => "host-discovery",
            NmapProfile::Comprehensive => "host-discovery-comprehensive",
            NmapProfile::Network => "network-fingerprint",
        }
    }

    fn program(&self) -> &str {
        &self.program
    }

    fn report_extension(&self) -> &'static str {
        "xml"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn output_limit(&self) -> usize {
        10 * MIB
    }

    fn build_args(&self, target: Ipv4Addr, options: &ScanOptions, report: &Path) -> Vec<String> {
        let mut args: Vec<String> = match self.profile {
            NmapProfile::Quick => vec!["-sV".into()],
            NmapProfile::Comprehensive => vec!["-sV".into(), "-sC".into()],
            NmapProfile::Network => vec!["-sV".into(), "-O".into(), "-A".into()],
        };

        let timing = options.get_int("timing").filter(|t| (0..=5).contains(t)).unwrap_or(4);
        args.push(format!("-T{timing}"));

        match options.get_str("ports").map(str::trim) {
            Some(ports) if RE_PORT_SPEC.is_match(ports) => {
                args.push("-p".into());
                args.push(ports.to_string());
            }
            other => {
                if let Some(rejected) = other {
                    debug!(ports = rejected, "Ignoring malformed `ports` option.");
                }
                match self.profile {
                    NmapProfile::Comprehensive => args.push("-p-".into()),
                    NmapProfile::Quick | NmapProfile::Network => {
                        args.push("--top-ports".into());
                        args.push("1000".into());
                    }
                }
            }
        }

        args.push("-oX".into());
        args.push(report.display().to_string());
        args.push(target.to_string());
        args
    }
}
