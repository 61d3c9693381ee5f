// src/core/scanner/sslscan.rs

use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use crate::core::models::ScanOptions;
use crate::core::scanner::{ExternalTool, MIB};

pub const DEFAULT_TLS_PORT: u16 = 443;

/// Lightweight certificate/protocol analysis through sslscan.
#[derive(Debug, Clone)]
pub struct SslScan {
    program: String,
    timeout: Duration,
}

impl SslScan {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl ExternalTool for SslScan {
    fn name(&self) -> &'static str {
        "tls-lightweight"
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
        5 * MIB
    }

    fn build_args(&self, target: Ipv4Addr, options: &ScanOptions, report: &Path) -> Vec<String> {
        let port = options.get_port("port").unwrap_or(DEFAULT_TLS_PORT);
        let mut args = vec![format!("--xml={}", report.display())];
        if options.get_bool("show_certificate") == Some(true) {
            args.push("--show-certificate".into());
        }
        args.push(format!("{target}:{port}"));
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::OptionValue;

    #[test]
    fn defaults_to_port_443() {
        let args = SslScan::new("sslscan", Duration::from_secs(120)).build_args(
            Ipv4Addr::new(10, 0, 0, 5),
            &ScanOptions::new(),
            Path::new("/tmp/s.xml"),
        );
        assert_eq!(args, vec!["--xml=/tmp/s.xml", "10.0.0.5:443"]);
    }

    #[test]
    fn honours_port_and_certificate_options() {
        let options = ScanOptions::new()
            .with("port", OptionValue::Integer(8443))
            .with("show_certificate", OptionValue::Bool(true));
        let args = SslScan::new("sslscan", Duration::from_secs(120)).build_args(
            Ipv4Addr::new(10, 0, 0, 5),
            &options,
            Path::new("/tmp/s.xml"),
        );
        assert_eq!(args, vec!["--xml=/tmp/s.xml", "--show-certificate", "10.0.0.5:8443"]);
    }
}
