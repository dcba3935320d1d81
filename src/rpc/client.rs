//! Low-level JSON-RPC 2.0 client — `JsonRpcClient`.
//!
//! One method per node endpoint the SDK uses. Returns raw wire values
//! (hex quantities and data strings); interpretation happens at the
//! ledger layer.

use crate::error::RpcError;
use crate::rpc::retry::{RetryConfig, RetryPolicy};
use crate::shared::Address;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC client bound to one node URL.
pub struct JsonRpcClient {
    url: String,
    client: Client,
    next_id: Arc<AtomicU64>,
}

impl JsonRpcClient {
    pub fn new(url: &str) -> Self {
        let builder = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(4);

        Self {
            url: url.trim_end_matches('/').to_string(),
            client: builder.build().expect("Failed to build HTTP client"),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    // ── Node endpoints ───────────────────────────────────────────────────

    pub async fn coinbase(&self) -> Result<Address, RpcError> {
        let s: String = self.call("eth_coinbase", json!([]), RetryPolicy::Idempotent).await?;
        Ok(Address::new(s))
    }

    pub async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        let raw: Vec<String> = self.call("eth_accounts", json!([]), RetryPolicy::Idempotent).await?;
        Ok(raw.into_iter().map(Address::new).collect())
    }

    pub async fn block_number(&self) -> Result<u64, RpcError> {
        let s: String = self
            .call("eth_blockNumber", json!([]), RetryPolicy::Idempotent)
            .await?;
        parse_quantity(&s)
    }

    /// Read-only contract call against the latest block.
    pub async fn eth_call(&self, to: &Address, data: &str) -> Result<String, RpcError> {
        self.call(
            "eth_call",
            json!([{ "to": to.as_str(), "data": data }, "latest"]),
            RetryPolicy::Idempotent,
        )
        .await
    }

    /// State-changing contract call. Never retried.
    pub async fn send_transaction(
        &self,
        from: &Address,
        to: &Address,
        data: &str,
    ) -> Result<String, RpcError> {
        self.call(
            "eth_sendTransaction",
            json!([{ "from": from.as_str(), "to": to.as_str(), "data": data }]),
            RetryPolicy::None,
        )
        .await
    }

    // ── Internal request machinery ───────────────────────────────────────

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        retry: RetryPolicy,
    ) -> Result<T, RpcError> {
        let config = match &retry {
            RetryPolicy::None => {
                return self.do_call(method, &params).await;
            }
            RetryPolicy::Idempotent => RetryConfig::idempotent(),
            RetryPolicy::Custom(c) => c.clone(),
        };

        let mut last_error = None;

        for attempt in 0..=config.max_retries {
            match self.do_call::<T>(method, &params).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    let should_retry = match &e {
                        RpcError::ServerError { status, .. } => {
                            config.retryable_statuses.contains(status)
                        }
                        RpcError::Transport(re) => {
                            re.is_connect() || re.is_timeout() || re.is_request()
                        }
                        // Node-level errors are not transient.
                        _ => false,
                    };

                    if should_retry && attempt < config.max_retries {
                        let delay = config.delay_for_attempt(attempt);
                        tracing::debug!(
                            attempt = attempt + 1,
                            max = config.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "Retrying {} against {}",
                            method,
                            self.url
                        );
                        futures_timer::Delay::new(delay).await;
                        last_error = Some(e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(RpcError::MaxRetriesExceeded {
            attempts: config.max_retries + 1,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }

    async fn do_call<T: DeserializeOwned>(&self, method: &str, params: &Value) -> Result<T, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
        });

        let resp = self.client.post(&self.url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(RpcError::ServerError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let parsed = resp.json::<RpcResponse>().await?;
        if let Some(err) = parsed.error {
            return Err(RpcError::Node {
                code: err.code,
                message: err.message,
            });
        }
        let result = parsed
            .result
            .ok_or_else(|| RpcError::InvalidResponse(format!("{method}: missing result")))?;
        serde_json::from_value(result)
            .map_err(|e| RpcError::InvalidResponse(format!("{method}: {e}")))
    }
}

impl Clone for JsonRpcClient {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            client: self.client.clone(),
            next_id: self.next_id.clone(),
        }
    }
}

/// Parses a hex quantity like `"0x4b7"`.
pub fn parse_quantity(s: &str) -> Result<u64, RpcError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|_| RpcError::InvalidResponse(format!("bad quantity: {s}")))
}
