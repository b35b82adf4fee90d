//! Integration tests for DoH fallback resolution
//!
//! A minimal HTTP responder on a loopback port stands in for a DoH
//! provider. The primary channel is exercised with `localhost`, whose
//! loopback answer is a poisoning sentinel, forcing the fallback path.

use std::net::IpAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use zaprobe_core::error::Error;
use zaprobe_core::resolver::{DohProvider, DohResolver, DomainResolver};
use zaprobe_core::SolverConfig;

/// Serve one HTTP request with the given body, then close
async fn serve_one(listener: TcpListener, status: &'static str, body: String) {
    let (mut stream, _) = listener.accept().await.unwrap();
    let mut buf = [0u8; 4096];
    // Read until the end of the request headers
    let mut request = Vec::new();
    loop {
        let n = stream.read(&mut buf).await.unwrap();
        request.extend_from_slice(&buf[..n]);
        if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/dns-json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await.unwrap();
    stream.shutdown().await.ok();
}

/// Spawn a single-shot DoH double and return a provider pointing at it
async fn doh_double(status: &'static str, body: String) -> DohProvider {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(serve_one(listener, status, body));
    DohProvider::new("double", format!("http://127.0.0.1:{port}/dns-query"), true)
}

#[tokio::test]
async fn test_sentinel_primary_falls_back_to_doh() {
    // `localhost` resolves to loopback, which is in the sentinel set, so
    // the resolver must distrust it and ask the fallback provider.
    let body = r#"{"Status":0,"Answer":[{"name":"localhost","type":1,"TTL":60,"data":"93.184.216.34"}]}"#;
    let provider = doh_double("200 OK", body.to_string()).await;

    let config = SolverConfig::default();
    let resolver = DohResolver::with_providers(&config, vec![provider]).unwrap();

    let ip = resolver.resolve("localhost").await.unwrap();
    assert_eq!(ip, "93.184.216.34".parse::<IpAddr>().unwrap());
}

#[tokio::test]
async fn test_answer_cached_for_session() {
    // The double serves exactly one request; a second resolve must hit the
    // cache instead of the network.
    let body = r#"{"Status":0,"Answer":[{"name":"localhost","type":1,"TTL":60,"data":"93.184.216.34"}]}"#;
    let provider = doh_double("200 OK", body.to_string()).await;

    let config = SolverConfig::default();
    let resolver = DohResolver::with_providers(&config, vec![provider]).unwrap();

    let first = resolver.resolve("localhost").await.unwrap();
    let second = resolver.resolve("localhost").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_sentinel_only_answers_are_fatal() {
    // Provider answers, but every record is a sentinel: resolution fails.
    let body = r#"{"Status":0,"Answer":[{"name":"localhost","type":1,"TTL":60,"data":"0.0.0.0"}]}"#;
    let provider = doh_double("200 OK", body.to_string()).await;

    let config = SolverConfig::default();
    let resolver = DohResolver::with_providers(&config, vec![provider]).unwrap();

    let err = resolver.resolve("localhost").await.unwrap_err();
    assert!(matches!(err, Error::Resolution { .. }));
}

#[tokio::test]
async fn test_no_providers_configured() {
    let config = SolverConfig::default();
    let resolver = DohResolver::with_providers(&config, Vec::new()).unwrap();

    let err = resolver.resolve("localhost").await.unwrap_err();
    match err {
        Error::Resolution { domain, .. } => assert_eq!(domain, "localhost"),
        other => panic!("expected Resolution error, got {other}"),
    }
}
