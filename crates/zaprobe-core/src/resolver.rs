//! Domain resolution with DNS-poisoning detection
//!
//! The primary channel is the system resolver. Censoring resolvers hand
//! back sentinel addresses (the all-zeros network or loopback) for blocked
//! domains; when that happens, or when resolution errors outright, a fixed
//! ordered list of DNS-over-HTTPS providers is queried in turn until one
//! yields a real A record. Answers are cached for the lifetime of the
//! resolver, so a session resolves each domain once, not once per worker.

use crate::config::SolverConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use std::net::IpAddr;
use tracing::{debug, info, warn};

/// Resolution seam used by the coordinator
#[async_trait]
pub trait DomainResolver: Send + Sync {
    /// Resolve a domain to a non-poisoned IP address
    async fn resolve(&self, domain: &str) -> Result<IpAddr>;
}

/// One DNS-over-HTTPS endpoint
#[derive(Debug, Clone)]
pub struct DohProvider {
    /// Provider name for logging
    pub name: String,
    /// Query endpoint URL
    pub url: String,
    /// Whether the endpoint requires an `Accept: application/dns-json` header
    pub dns_json_accept: bool,
}

impl DohProvider {
    /// Create a provider entry
    pub fn new(name: impl Into<String>, url: impl Into<String>, dns_json_accept: bool) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            dns_json_accept,
        }
    }
}

/// Default fallback providers, queried in order
pub fn default_providers() -> Vec<DohProvider> {
    vec![
        DohProvider::new("cloudflare", "https://cloudflare-dns.com/dns-query", true),
        DohProvider::new("google", "https://dns.google/resolve", false),
    ]
}

/// JSON answer section of a DoH response
#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(rename = "type")]
    record_type: u16,
    #[serde(default)]
    data: String,
}

/// JSON shape of a DoH response; only the answer section matters here
#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Answer", default)]
    answer: Vec<DohAnswer>,
}

/// A record type in DNS wire terms
const TYPE_A: u16 = 1;

/// Whether an address is a known poisoning sentinel: the all-zeros
/// network or loopback, both reachable-looking forgeries.
pub fn is_sentinel(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.octets()[0] == 0 || v4.is_loopback(),
        IpAddr::V6(v6) => v6.is_unspecified() || v6.is_loopback(),
    }
}

/// Resolver with system-channel primary and DoH fallback
pub struct DohResolver {
    client: reqwest::Client,
    providers: Vec<DohProvider>,
    cache: DashMap<String, IpAddr>,
    timeout: std::time::Duration,
}

impl DohResolver {
    /// Create a resolver with the default provider list
    pub fn new(config: &SolverConfig) -> Result<Self> {
        Self::with_providers(config, default_providers())
    }

    /// Create a resolver with a custom provider list
    pub fn with_providers(config: &SolverConfig, providers: Vec<DohProvider>) -> Result<Self> {
        // DoH endpoints themselves are frequently intercepted on censored
        // networks; a spoofed answer is caught by the probe, not here.
        let client = reqwest::Client::builder()
            .timeout(config.doh_timeout())
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            providers,
            cache: DashMap::new(),
            timeout: config.doh_timeout(),
        })
    }

    /// Primary channel: system resolver, IPv4 preferred
    async fn system_lookup(&self, domain: &str) -> Option<IpAddr> {
        let addrs: Vec<_> =
            tokio::time::timeout(self.timeout, tokio::net::lookup_host((domain, 443)))
                .await
                .ok()?
                .ok()?
                .map(|sa| sa.ip())
                .collect();
        addrs
            .iter()
            .copied()
            .find(IpAddr::is_ipv4)
            .or_else(|| addrs.first().copied())
    }

    /// Query one DoH provider for an A record
    async fn query_provider(&self, provider: &DohProvider, domain: &str) -> Result<IpAddr> {
        let mut request = self
            .client
            .get(&provider.url)
            .query(&[("name", domain), ("type", "A")]);
        if provider.dns_json_accept {
            request = request.header("accept", "application/dns-json");
        }

        let response = request.send().await.map_err(|e| Error::DohProvider {
            provider: provider.name.clone(),
            reason: e.to_string(),
        })?;
        let body: DohResponse = response.json().await.map_err(|e| Error::DohProvider {
            provider: provider.name.clone(),
            reason: e.to_string(),
        })?;

        first_valid_answer(&body).ok_or_else(|| Error::DohProvider {
            provider: provider.name.clone(),
            reason: "no usable A record in answer".to_string(),
        })
    }
}

/// First A record in the answer section that is not a sentinel
fn first_valid_answer(response: &DohResponse) -> Option<IpAddr> {
    response
        .answer
        .iter()
        .filter(|a| a.record_type == TYPE_A)
        .filter_map(|a| a.data.parse::<IpAddr>().ok())
        .find(|ip| !is_sentinel(*ip))
}

#[async_trait]
impl DomainResolver for DohResolver {
    async fn resolve(&self, domain: &str) -> Result<IpAddr> {
        if let Some(cached) = self.cache.get(domain) {
            return Ok(*cached);
        }

        match self.system_lookup(domain).await {
            Some(ip) if !is_sentinel(ip) => {
                debug!(domain, %ip, "resolved via system channel");
                self.cache.insert(domain.to_string(), ip);
                return Ok(ip);
            }
            Some(ip) => {
                warn!(domain, %ip, "system resolver returned a poisoning sentinel");
            }
            None => {
                warn!(domain, "system resolution failed");
            }
        }

        let mut reasons = Vec::new();
        for provider in &self.providers {
            match self.query_provider(provider, domain).await {
                Ok(ip) => {
                    info!(domain, %ip, provider = %provider.name, "resolved via DoH fallback");
                    self.cache.insert(domain.to_string(), ip);
                    return Ok(ip);
                }
                Err(e) => {
                    debug!(domain, provider = %provider.name, error = %e, "DoH provider failed");
                    reasons.push(format!("{}: {e}", provider.name));
                }
            }
        }

        Err(Error::resolution(
            domain,
            if reasons.is_empty() {
                "no fallback providers configured".to_string()
            } else {
                reasons.join("; ")
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_sentinel_detection() {
        assert!(is_sentinel("0.0.0.0".parse().unwrap()));
        assert!(is_sentinel("0.0.0.1".parse().unwrap()));
        assert!(is_sentinel("127.0.0.1".parse().unwrap()));
        assert!(is_sentinel("::1".parse().unwrap()));
        assert!(!is_sentinel("93.184.216.34".parse().unwrap()));
        assert!(!is_sentinel("1.1.1.1".parse().unwrap()));
    }

    #[test]
    fn test_first_valid_answer_skips_sentinels() {
        let body = r#"{
            "Status": 0,
            "Answer": [
                {"name": "x", "type": 5, "TTL": 60, "data": "cdn.example.net."},
                {"name": "x", "type": 1, "TTL": 60, "data": "0.0.0.0"},
                {"name": "x", "type": 1, "TTL": 60, "data": "93.184.216.34"}
            ]
        }"#;
        let response: DohResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            first_valid_answer(&response),
            Some(IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)))
        );
    }

    #[test]
    fn test_no_answer_section() {
        let response: DohResponse = serde_json::from_str(r#"{"Status": 3}"#).unwrap();
        assert_eq!(first_valid_answer(&response), None);
    }

    #[test]
    fn test_default_provider_order() {
        let providers = default_providers();
        assert_eq!(providers[0].name, "cloudflare");
        assert!(providers[0].dns_json_accept);
        assert_eq!(providers[1].name, "google");
    }
}
