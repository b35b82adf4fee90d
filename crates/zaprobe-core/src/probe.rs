//! Connectivity probe
//!
//! One HTTPS request against the resolved address with the original domain
//! asserted as the virtual host, certificate validation disabled, and a
//! bounded timeout. The probe characterizes transport reachability, not
//! content trust: any completed exchange counts as success, even an
//! application-layer error response, because it proves the transport path
//! is open. The dividing line is strictly connection/TLS failure.

use crate::config::SolverConfig;
use crate::error::{Error, Result};
use crate::lifecycle::RedirectionSlot;
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::debug;

/// A completed probe response, kept for diagnostics
#[derive(Debug, Clone, Copy)]
pub struct ProbeResponse {
    /// HTTP status code of the response
    pub status: u16,
}

/// Connectivity check seam used by probe workers
#[async_trait]
pub trait ConnectivityCheck: Send + Sync {
    /// Issue one request for `domain` against `addr:port` through the
    /// given redirection slot's traffic path.
    async fn check(
        &self,
        domain: &str,
        addr: IpAddr,
        port: u16,
        slot: RedirectionSlot,
    ) -> Result<ProbeResponse>;
}

/// Real HTTPS probe backed by reqwest
pub struct HttpsProbe {
    timeout: Duration,
    user_agent: String,
}

impl HttpsProbe {
    /// Create a probe from solver configuration
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            timeout: config.probe_timeout(),
            user_agent: config.user_agent.clone(),
        }
    }
}

#[async_trait]
impl ConnectivityCheck for HttpsProbe {
    async fn check(
        &self,
        domain: &str,
        addr: IpAddr,
        port: u16,
        slot: RedirectionSlot,
    ) -> Result<ProbeResponse> {
        // Pin DNS to the resolved address so the request carries the real
        // SNI and Host for `domain` while connecting to `addr`. Port 0 in
        // the override means "use the URL port".
        let client = reqwest::Client::builder()
            .resolve(domain, SocketAddr::new(addr, 0))
            .danger_accept_invalid_certs(true)
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;

        let url = if port == 443 {
            format!("https://{domain}/")
        } else {
            format!("https://{domain}:{port}/")
        };

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| classify_request_error(&e, self.timeout))?;

        let status = response.status().as_u16();
        debug!(domain, %addr, %slot, status, "probe response observed");
        Ok(ProbeResponse { status })
    }
}

/// Map a reqwest error into the probe failure taxonomy
fn classify_request_error(err: &reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        return Error::ProbeTimeout {
            elapsed_ms: timeout.as_millis() as u64,
        };
    }

    // Walk the source chain: hyper wraps the io error, rustls failures
    // surface as handshake/certificate messages.
    let mut chain = Vec::new();
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        chain.push(e.to_string().to_lowercase());
        source = e.source();
    }
    let combined = chain.join(": ");

    if combined.contains("tls")
        || combined.contains("handshake")
        || combined.contains("certificate")
    {
        Error::ProbeTls(combined)
    } else {
        Error::ProbeConnection(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[tokio::test]
    async fn test_connection_refused_classified() {
        // Nothing listens on this port; the probe must fail at the
        // connection layer, not time out.
        let config = SolverConfig {
            probe_timeout_ms: 2_000,
            ..SolverConfig::default()
        };
        let probe = HttpsProbe::new(&config);
        let err = probe
            .check(
                "localhost",
                "127.0.0.1".parse().unwrap(),
                59_999,
                RedirectionSlot::new(200),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.failure_kind(),
            FailureKind::Connection | FailureKind::Tls
        ));
    }
}
