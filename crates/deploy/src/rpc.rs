//! Shared utilities for Ethereum JSON-RPC endpoints.

use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Create an HTTP client whose every request is bounded by `timeout`.
pub fn create_client(timeout: Duration) -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// A JSON-RPC `error` object is turned into an error carrying its code,
/// message and revert data when present.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = result.get("error") {
        anyhow::bail!("{} failed: {}", method, describe_rpc_error(error));
    }

    let result_value = result
        .get("result")
        .with_context(|| format!("No result in {} response", method))?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

fn describe_rpc_error(error: &Value) -> String {
    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("unknown");
    let mut description = match error.get("code").and_then(|c| c.as_i64()) {
        Some(code) => format!("RPC error {}: {}", code, message),
        None => format!("RPC error: {}", message),
    };
    if let Some(data) = error.get("data").and_then(|d| d.as_str()) {
        description.push_str(&format!(" (data: {})", data));
    }
    description
}

/// Poll `check_fn` until it yields a value or `timeout` elapses.
///
/// `Ok(None)` means "not yet"; errors are logged and polling continues.
pub async fn poll_until<T, F, Fut>(
    name: &str,
    timeout: Duration,
    interval: Duration,
    check_fn: F,
) -> Result<T, anyhow::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Option<T>, anyhow::Error>>,
{
    let start = std::time::Instant::now();

    loop {
        match check_fn().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {
                tracing::trace!(target_name = %name, "Not ready yet, retrying...");
            }
            Err(e) => {
                tracing::trace!(error = %e, target_name = %name, "Check failed, retrying...");
            }
        }

        if start.elapsed() + interval > timeout {
            anyhow::bail!("Timeout after {:?} waiting for {}", timeout, name);
        }

        tokio::time::sleep(interval).await;
    }
}
