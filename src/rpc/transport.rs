/// Single JSON-RPC round trip. Retrying and pacing happen above this layer.
use crate::errors::{classify_http_status, classify_json_rpc_error, RpcError};
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Endpoint label for logs and errors
    fn endpoint(&self) -> &str;

    /// Send `method` with `params`; returns the JSON-RPC `result`
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

/// HTTPS POST transport over reqwest
pub struct HttpRpcTransport {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpRpcTransport {
    /// `timeout` bounds each request independently of any retry timer
    pub fn new(url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::from_reqwest(&e, url))?;
        Ok(Self {
            client,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl RpcTransport for HttpRpcTransport {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| RpcError::from_reqwest(&e, &self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_status(status.as_u16(), &body, &self.url));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RpcError::from_reqwest(&e, &self.url))?;

        logger::verbose(
            LogTag::Rpc,
            &format!("{} response from {}: {}", method, self.url, body),
        );

        parse_rpc_envelope(body, &self.url)
    }
}

/// An `error` member is a failure even on HTTP 200
pub fn parse_rpc_envelope(mut body: Value, endpoint: &str) -> Result<Value, RpcError> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| error.to_string());
        return Err(classify_json_rpc_error(code, &message, endpoint));
    }

    match body.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(RpcError::Unexpected {
            endpoint: endpoint.to_string(),
            message: "response has neither result nor error".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureClass;

    #[test]
    fn test_envelope_error_on_http_200() {
        let body = json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32601, "message": "Method not found"}});
        let err = parse_rpc_envelope(body, "p").unwrap_err();
        assert_eq!(err.class(), FailureClass::NonRetryable);

        let body = json!({"jsonrpc": "2.0", "id": 1, "error": {"code": 429, "message": "Too many requests"}});
        assert_eq!(parse_rpc_envelope(body, "p").unwrap_err().class(), FailureClass::RateLimit);
    }

    #[test]
    fn test_envelope_result() {
        let body = json!({"jsonrpc": "2.0", "id": 1, "result": [1, 2]});
        assert_eq!(parse_rpc_envelope(body, "p").unwrap(), json!([1, 2]));

        let body = json!({"jsonrpc": "2.0", "id": 1, "result": null});
        assert_eq!(parse_rpc_envelope(body, "p").unwrap(), Value::Null);

        assert!(parse_rpc_envelope(json!({"id": 1}), "p").is_err());
    }
}
