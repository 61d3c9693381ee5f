// src/core/target.rs

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::error::TargetError;
use crate::core::models::ResolvedTarget;

static RE_IPV4: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,3}\.){3}\d{1,3}$").unwrap());
static RE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").unwrap());
static RE_TLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]{2,63}$").unwrap());

const MAX_DOMAIN_LEN: usize = 253;

/// Forward DNS lookups. Kept behind a trait so admission can run without a network.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Returns the first IPv4 address of the host's A records.
    async fn lookup_ipv4(&self, host: &str) -> Result<Ipv4Addr, String>;
}

/// `HostResolver` backed by hickory's tokio resolver.
pub struct DnsHostResolver {
    resolver: TokioAsyncResolver,
}

impl DnsHostResolver {
    pub fn new() -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
        }
    }
}

impl Default for DnsHostResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostResolver for DnsHostResolver {
    async fn lookup_ipv4(&self, host: &str) -> Result<Ipv4Addr, String> {
        debug!(host, "Looking up A record.");
        let lookup = self.resolver.ipv4_lookup(host).await.map_err(|e| e.to_string())?;
        lookup
            .iter()
            .next()
            .map(|a| a.0)
            .ok_or_else(|| "no A record found".to_string())
    }
}

/// Classifies a raw target and resolves it to the IPv4 address that will be scanned.
#[derive(Clone)]
pub struct TargetResolver {
    dns: Arc<dyn HostResolver>,
}

impl TargetResolver {
    pub fn new(dns: Arc<dyn HostResolver>) -> Self {
        Self { dns }
    }

    pub async fn resolve(&self, raw_target: &str) -> Result<ResolvedTarget, TargetError> {
        let trimmed = raw_target.trim();
        if trimmed.is_empty() {
            return Err(TargetError::Validation(
                "a target (domain or IP address) is required".to_string(),
            ));
        }

        let host = strip_scheme(trimmed).trim_end_matches('/');

        // IPv4 literals skip the lookup.
        if RE_IPV4.is_match(host) {
            let ip = parse_dotted_quad(host).ok_or_else(TargetError::invalid_format)?;
            debug!(host, "Target is an IPv4 literal.");
            return Ok(ResolvedTarget {
                canonical: ip.to_string(),
                resolved_ip: ip,
            });
        }

        if !is_domain_name(host) {
            debug!(host = raw_target, "Target rejected by domain grammar.");
            return Err(TargetError::invalid_format());
        }

        let canonical = host.to_ascii_lowercase();
        match self.dns.lookup_ipv4(&canonical).await {
            Ok(ip) => {
                info!(host = %canonical, resolved_ip = %ip, "Target resolved.");
                Ok(ResolvedTarget { canonical, resolved_ip: ip })
            }
            Err(cause) => {
                warn!(host = %canonical, error = %cause, "DNS resolution failed.");
                Err(TargetError::Resolution { host: canonical, cause })
            }
        }
    }
}

fn strip_scheme(input: &str) -> &str {
    for scheme in ["http://", "https://"] {
        if let Some(prefix) = input.get(..scheme.len()) {
            if prefix.eq_ignore_ascii_case(scheme) {
                return &input[scheme.len()..];
            }
        }
    }
    input
}

/// Octets are decimal even when zero-padded: `010.0.0.1` is `10.0.0.1`.
fn parse_dotted_quad(host: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = host.split('.');
    for octet in &mut octets {
        *octet = parts.next()?.parse().ok()?;
    }
    match parts.next() {
        Some(_) => None,
        None => Some(Ipv4Addr::from(octets)),
    }
}

/// Labels of 1-63 alphanumerics/hyphens without edge hyphens, at least two
/// labels, and an alphabetic final label of 2+ characters.
fn is_domain_name(host: &str) -> bool {
    if host.is_empty() || host.len() > MAX_DOMAIN_LEN {
        return false;
    }
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let (tld, rest) = match labels.split_last() {
        Some(parts) => parts,
        None => return false,
    };
    RE_TLD.is_match(tld) && rest.iter().all(|label| RE_LABEL.is_match(label))
}
