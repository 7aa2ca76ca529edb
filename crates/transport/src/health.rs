use std::time::{Duration, Instant};

use crate::Transport;

/// Health check result
#[derive(Debug, Clone, PartialEq)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub latency_ms: u64,
    /// Document returned by `/ping`
    pub body: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl HealthCheckResult {
    pub fn healthy(latency_ms: u64, body: serde_json::Value) -> Self {
        Self { healthy: true, latency_ms, body: Some(body), error: None }
    }

    pub fn unhealthy(error: String) -> Self {
        Self { healthy: false, latency_ms: 0, body: None, error: Some(error) }
    }
}

/// Probe the backend with `/ping`, bounded by `timeout`
///
/// Never fails: an unreachable or slow backend is an unhealthy result.
pub async fn check_health(transport: &dyn Transport, timeout: Duration) -> HealthCheckResult {
    let start = Instant::now();

    match tokio::time::timeout(timeout, transport.ping()).await {
        Ok(Ok(body)) => HealthCheckResult::healthy(start.elapsed().as_millis() as u64, body),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "ping failed");
            HealthCheckResult::unhealthy(e.to_string())
        }
        Err(_) => HealthCheckResult::unhealthy(format!("Ping timed out after {}ms", timeout.as_millis())),
    }
}
