// src/core/scanner/nikto.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use crate::core::models::ScanOptions;
use crate::core::scanner::{ExternalTool, MIB};

static RE_TUNING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-cx]{1,16}$").unwrap());

/// Web-surface scan through nikto with an XML report.
#[derive(Debug, Clone)]
pub struct Nikto {
    program: String,
    timeout: Duration,
}

impl Nikto {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl ExternalTool for Nikto {
    fn name(&self) -> &'static str {
        "web-surface"
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
        let mut args = vec![
            "-h".to_string(),
            target.to_string(),
            "-Format".to_string(),
            "xml".to_string(),
            "-output".to_string(),
            report.display().to_string(),
        ];
        if let Some(port) = options.get_port("port") {
            args.push("-p".into());
            args.push(port.to_string());
        }
        if options.get_bool("ssl") == Some(true) {
            args.push("-ssl".into());
        }
        // Default tuning skips DoS checks ("x 6").
        match options.get_str("tuning").filter(|t| RE_TUNING.is_match(t)) {
            Some(tuning) => {
                args.push("-Tuning".into());
                args.push(tuning.to_string());
            }
            None => args.extend(["-Tuning".to_string(), "x".to_string(), "6".to_string()]),
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::OptionValue;

    #[test]
    fn default_invocation() {
        let args = Nikto::new("nikto", Duration::from_secs(300)).build_args(
            Ipv4Addr::new(192, 0, 2, 1),
            &ScanOptions::new(),
            Path::new("/tmp/n.xml"),
        );
        assert_eq!(args.join(" "), "-h 192.0.2.1 -Format xml -output /tmp/n.xml -Tuning x 6");
    }

    #[test]
    fn port_ssl_and_tuning_options() {
        let options = ScanOptions::new()
            .with("port", OptionValue::Integer(8443))
            .with("ssl", OptionValue::Bool(true))
            .with("tuning", OptionValue::Text("123b".into()));
        let args = Nikto::new("nikto", Duration::from_secs(300)).build_args(
            Ipv4Addr::new(192, 0, 2, 1),
            &options,
            Path::new("/tmp/n.xml"),
        );
        assert_eq!(
            args.join(" "),
            "-h 192.0.2.1 -Format xml -output /tmp/n.xml -p 8443 -ssl -Tuning 123b"
        );
    }
}
