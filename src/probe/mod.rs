//! HTTP check execution against monitored endpoints.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::redirect;
use std::time::{Duration, Instant};

use crate::db::models::{CheckResult, Endpoint};

/// Executes one check against an endpoint.
///
/// A failed check is data, not an error: implementations classify every
/// outcome into a [`CheckResult`] and never raise past this boundary.
#[async_trait]
pub trait Checker: Send + Sync {
    async fn check(&self, endpoint: &Endpoint) -> CheckResult;
}

/// The real checker: one GET per call, bounded by the endpoint's timeout,
/// following redirects, identifying itself with the configured user agent.
pub struct HttpChecker {
    client: reqwest::Client,
}

impl HttpChecker {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Checker for HttpChecker {
    async fn check(&self, endpoint: &Endpoint) -> CheckResult {
        let timeout = Duration::from_secs(u64::from(endpoint.timeout_secs.max(1)));
        let started = Instant::now();
        let response = self
            .client
            .get(&endpoint.url)
            .timeout(timeout)
            .send()
            .await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let checked_at = Utc::now();

        match response {
            Ok(response) => {
                let status = response.status().as_u16();
                if status == endpoint.expected_status {
                    CheckResult {
                        endpoint_id: endpoint.id,
                        status_code: Some(status),
                        latency_ms,
                        is_up: true,
                        error: None,
                        checked_at,
                    }
                } else {
                    CheckResult {
                        endpoint_id: endpoint.id,
                        status_code: Some(status),
                        latency_ms,
                        is_up: false,
                        error: Some(format!("unexpected status code: {status}")),
                        checked_at,
                    }
                }
            }
            Err(e) => CheckResult {
                endpoint_id: endpoint.id,
                status_code: None,
                latency_ms,
                is_up: false,
                error: Some(e.to_string()),
                checked_at,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves exactly one canned HTTP/1.1 response, then closes.
    async fn serve_once(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        format!("http://{addr}/")
    }

    fn endpoint(url: String, expected_status: u16) -> Endpoint {
        Endpoint {
            id: 1,
            url,
            name: "test".to_string(),
            check_interval_secs: 60,
            timeout_secs: 2,
            expected_status,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn expected_status_is_up() {
        let url = serve_once("200 OK").await;
        let checker = HttpChecker::new("uptime-monitor-test").unwrap();

        let result = checker.check(&endpoint(url, 200)).await;
        assert!(result.is_up);
        assert_eq!(result.status_code, Some(200));
        assert!(result.error.is_none());
        assert!(result.latency_ms >= 0.0);
    }

    #[tokio::test]
    async fn unexpected_status_is_down_with_reason() {
        let url = serve_once("503 Service Unavailable").await;
        let checker = HttpChecker::new("uptime-monitor-test").unwrap();

        let result = checker.check(&endpoint(url, 200)).await;
        assert!(!result.is_up);
        assert_eq!(result.status_code, Some(503));
        assert_eq!(
            result.error.as_deref(),
            Some("unexpected status code: 503")
        );
    }

    #[tokio::test]
    async fn non_default_expected_status_is_honored() {
        let url = serve_once("204 No Content").await;
        let checker = HttpChecker::new("uptime-monitor-test").unwrap();

        let result = checker.check(&endpoint(url, 204)).await;
        assert!(result.is_up);
        assert_eq!(result.status_code, Some(204));
    }

    #[tokio::test]
    async fn transport_failure_has_no_status_code() {
        // Bind a port to learn a free one, then release it so the connect
        // is refused.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let checker = HttpChecker::new("uptime-monitor-test").unwrap();
        let result = checker.check(&endpoint(format!("http://{addr}/"), 200)).await;
        assert!(!result.is_up);
        assert_eq!(result.status_code, None);
        assert!(result.error.is_some());
    }
}
