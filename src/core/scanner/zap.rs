// src/core/scanner/zap.rs

use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use crate::core::models::ScanOptions;
use crate::core::scanner::{ExternalTool, MIB};

/// Web-application attack simulation through the OWASP ZAP baseline script.
#[derive(Debug, Clone)]
pub struct Zap {
    program: String,
    timeout: Duration,
}

impl Zap {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn target_url(target: Ipv4Addr, options: &ScanOptions) -> String {
        let scheme = match options.get_str("scheme") {
            Some(s) if s.eq_ignore_ascii_case("https") => "https",
            _ => "http",
        };
        match options.get_port("port") {
            Some(port) => format!("{scheme}://{target}:{port}"),
            None => format!("{scheme}://{target}"),
        }
    }
}

impl ExternalTool for Zap {
    fn name(&self) -> &'static str {
        "web-attack-simulation"
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
        20 * MIB
    }

    fn build_args(&self, target: Ipv4Addr, options: &ScanOptions, report: &Path) -> Vec<String> {
        let mut args = vec![
            "-t".to_string(),
            Self::target_url(target, options),
            "-x".to_string(),
            report.display().to_string(),
            // -I: do not fail on warnings
            "-I".to_string(),
        ];
        if options.get_bool("ajax_spider") == Some(true) {
            args.push("-j".into());
        }
        if let Some(minutes) = options.get_int("minutes").filter(|m| (1..=60).contains(m)) {
            args.push("-m".into());
            args.push(minutes.to_string());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::OptionValue;

    #[test]
    fn defaults_to_plain_http() {
        let args = Zap::new("zap-baseline.py", Duration::from_secs(600)).build_args(
            Ipv4Addr::new(198, 51, 100, 7),
            &ScanOptions::new(),
            Path::new("/tmp/z.xml"),
        );
        assert_eq!(args.join(" "), "-t http://198.51.100.7 -x /tmp/z.xml -I");
    }

    #[test]
    fn scheme_port_spider_and_minutes() {
        let options = ScanOptions::new()
            .with("scheme", OptionValue::Text("HTTPS".into()))
            .with("port", OptionValue::Integer(8443))
            .with("ajax_spider", OptionValue::Bool(true))
            .with("minutes", OptionValue::Integer(3));
        let args = Zap::new("zap-baseline.py", Duration::from_secs(600)).build_args(
            Ipv4Addr::new(198, 51, 100, 7),
            &options,
            Path::new("/tmp/z.xml"),
        );
        assert_eq!(args.join(" "), "-t https://198.51.100.7:8443 -x /tmp/z.xml -I -j -m 3");
    }
}
