// src/core/scanner/testssl.rs

use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use crate::core::models::ScanOptions;
use crate::core::scanner::sslscan::DEFAULT_TLS_PORT;
use crate::core::scanner::{ExternalTool, MIB};

/// Comprehensive TLS testing through testssl.sh with a JSON report.
///
/// testssl.sh routinely exits non-zero when it flags weaknesses; the tie-break
/// policy keeps those runs as long as the JSON file was written.
#[derive(Debug, Clone)]
pub struct TestSsl {
    program: String,
    timeout: Duration,
}

impl TestSsl {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl ExternalTool for TestSsl {
    fn name(&self) -> &'static str {
        "tls-comprehensive"
    }

    fn program(&self) -> &str {
        &self.program
    }

    fn report_extension(&self) -> &'static str {
        "json"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn output_limit(&self) -> usize {
        10 * MIB
    }

    fn build_args(&self, target: Ipv4Addr, options: &ScanOptions, report: &Path) -> Vec<String> {
        let port = options.get_port("port").unwrap_or(DEFAULT_TLS_PORT);
        let mut args = vec![
            "--jsonfile".to_string(),
            report.display().to_string(),
            "--quiet".to_string(),
        ];
        if options.get_bool("fast") == Some(true) {
            args.push("--fast".into());
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
    fn builds_json_report_invocation() {
        let tool = TestSsl::new("testssl.sh", Duration::from_secs(180));
        let report = Path::new("/tmp/t.json");
        let args = tool.build_args(Ipv4Addr::new(1, 2, 3, 4), &ScanOptions::new(), report);
        assert_eq!(args.join(" "), "--jsonfile /tmp/t.json --quiet 1.2.3.4:443");

        let options = ScanOptions::new()
            .with("fast", OptionValue::Bool(true))
            .with("port", OptionValue::Integer(993));
        let args = tool.build_args(Ipv4Addr::new(1, 2, 3, 4), &options, Path::new("/tmp/t.json"));
        assert_eq!(args.join(" "), "--jsonfile /tmp/t.json --quiet --fast 1.2.3.4:993");
    }
}
