/// RPC failure taxonomy and the rules that sort raw provider failures into it
use serde::{Deserialize, Serialize};

/// How the backoff executor treats a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureClass {
    RateLimit,
    Transient,
    NonRetryable,
    Unknown,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::RateLimit => "rate_limit",
            FailureClass::Transient => "transient",
            FailureClass::NonRetryable => "non_retryable",
            FailureClass::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RpcError {
    /// HTTP 429 or a provider rate-limit signal
    RateLimited { endpoint: String, message: String },
    /// Timeouts, resets, 5xx
    Transient { endpoint: String, message: String },
    /// Malformed or unsupported request; retrying the same call cannot help
    NonRetryable {
        endpoint: String,
        code: Option<i64>,
        message: String,
    },
    /// Anything the rules below do not recognise
    Unexpected { endpoint: String, message: String },
    RetriesExhausted { attempts: u32, last: Box<RpcError> },
}

impl RpcError {
    pub fn class(&self) -> FailureClass {
        match self {
            RpcError::RateLimited { .. } => FailureClass::RateLimit,
            RpcError::Transient { .. } => FailureClass::Transient,
            RpcError::NonRetryable { .. } => FailureClass::NonRetryable,
            RpcError::Unexpected { .. } => FailureClass::Unknown,
            RpcError::RetriesExhausted { last, .. } => last.class(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self.class(), FailureClass::NonRetryable)
    }

    pub fn message(&self) -> String {
        match self {
            RpcError::RateLimited { message, .. }
            | RpcError::Transient { message, .. }
            | RpcError::NonRetryable { message, .. }
            | RpcError::Unexpected { message, .. } => message.clone(),
            RpcError::RetriesExhausted { last, .. } => last.message(),
        }
    }

    /// Transport-level failure from reqwest
    pub fn from_reqwest(err: &reqwest::Error, endpoint: &str) -> Self {
        if let Some(status) = err.status() {
            return classify_http_status(status.as_u16(), &err.to_string(), endpoint);
        }
        let endpoint = endpoint.to_string();
        let message = err.to_string();
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            RpcError::Transient { endpoint, message }
        } else if err.is_decode() {
            RpcError::Unexpected { endpoint, message }
        } else {
            classify_message(message, endpoint)
        }
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcError::RateLimited { endpoint, message } => {
                write!(f, "Rate limited by {}: {}", endpoint, message)
            }
            RpcError::Transient { endpoint, message } => {
                write!(f, "Transient failure from {}: {}", endpoint, message)
            }
            RpcError::NonRetryable {
                endpoint,
                code,
                message,
            } => match code {
                Some(code) => write!(f, "Non-retryable error {} from {}: {}", code, endpoint, message),
                None => write!(f, "Non-retryable error from {}: {}", endpoint, message),
            },
            RpcError::Unexpected { endpoint, message } => {
                if endpoint.is_empty() {
                    write!(f, "{}", message)
                } else {
                    write!(f, "Unexpected error from {}: {}", endpoint, message)
                }
            }
            RpcError::RetriesExhausted { attempts, last } => {
                write!(f, "Gave up after {} attempts: {}", attempts, last)
            }
        }
    }
}

impl std::error::Error for RpcError {}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::Unexpected {
            endpoint: String::new(),
            message: format!("Invalid JSON: {}", err),
        }
    }
}

impl From<String> for RpcError {
    fn from(message: String) -> Self {
        classify_message(message, String::new())
    }
}

// =============================================================================
// CLASSIFICATION RULES
// =============================================================================

const RATE_LIMIT_CODES: &[i64] = &[-32005, -32429];
const NON_RETRYABLE_CODES: &[i64] = &[-32600, -32601, -32602];

fn is_rate_limit_message(lower: &str) -> bool {
    lower.contains("429") || lower.contains("too many requests") || lower.contains("rate limit")
}

fn is_non_retryable_message(lower: &str) -> bool {
    lower.contains("method not found")
        || lower.contains("invalid params")
        || lower.contains("unsupported")
}

fn is_transient_message(lower: &str) -> bool {
    lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection reset")
        || lower.contains("connection refused")
        || lower.contains("broken pipe")
}

fn classify_message(message: String, endpoint: String) -> RpcError {
    let lower = message.to_lowercase();
    if is_rate_limit_message(&lower) {
        RpcError::RateLimited { endpoint, message }
    } else if is_non_retryable_message(&lower) {
        RpcError::NonRetryable {
            endpoint,
            code: None,
            message,
        }
    } else if is_transient_message(&lower) {
        RpcError::Transient { endpoint, message }
    } else {
        RpcError::Unexpected { endpoint, message }
    }
}

/// Non-success HTTP status from the provider
pub fn classify_http_status(status: u16, body: &str, endpoint: &str) -> RpcError {
    let endpoint = endpoint.to_string();
    let message = format!("HTTP {}: {}", status, body.trim());
    match status {
        429 => RpcError::RateLimited { endpoint, message },
        408 | 500..=599 => RpcError::Transient { endpoint, message },
        400 | 404 | 405 => RpcError::NonRetryable {
            endpoint,
            code: None,
            message,
        },
        _ => classify_message(message, endpoint),
    }
}

/// `error` object inside an HTTP 200 JSON-RPC response
pub fn classify_json_rpc_error(code: i64, message: &str, endpoint: &str) -> RpcError {
    let endpoint = endpoint.to_string();
    let lower = message.to_lowercase();
    let message = message.to_string();

    if RATE_LIMIT_CODES.contains(&code) || is_rate_limit_message(&lower) {
        RpcError::RateLimited { endpoint, message }
    } else if NON_RETRYABLE_CODES.contains(&code) || is_non_retryable_message(&lower) {
        RpcError::NonRetryable {
            endpoint,
            code: Some(code),
            message,
        }
    } else if is_transient_message(&lower) {
        RpcError::Transient { endpoint, message }
    } else {
        RpcError::Unexpected {
            endpoint,
            message: format!("code {}: {}", code, message),
        }
    }
}

// =============================================================================
// PARTIAL ITEM FAILURE
// =============================================================================

/// One signature that could not be resolved inside an otherwise healthy batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub signature: String,
    pub reason: String,
    pub class: FailureClass,
}

impl ItemFailure {
    pub fn from_error(signature: &str, error: &RpcError) -> Self {
        Self {
            signature: signature.to_string(),
            reason: error.to_string(),
            class: error.class(),
        }
    }
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.signature, self.class.as_str(), self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_classification() {
        assert_eq!(classify_http_status(429, "", "p").class(), FailureClass::RateLimit);
        assert_eq!(classify_http_status(503, "", "p").class(), FailureClass::Transient);
        assert_eq!(classify_http_status(408, "", "p").class(), FailureClass::Transient);
        assert_eq!(classify_http_status(405, "", "p").class(), FailureClass::NonRetryable);
        assert_eq!(classify_http_status(418, "teapot", "p").class(), FailureClass::Unknown);
    }

    #[test]
    fn test_json_rpc_classification() {
        assert_eq!(
            classify_json_rpc_error(-32601, "Method not found", "p").class(),
            FailureClass::NonRetryable
        );
        assert_eq!(
            classify_json_rpc_error(-32005, "Node is behind", "p").class(),
            FailureClass::RateLimit
        );
        assert_eq!(
            classify_json_rpc_error(-32000, "Too many requests for a specific RPC call", "p").class(),
            FailureClass::RateLimit
        );
        assert_eq!(
            classify_json_rpc_error(-32007, "Slot was skipped", "p").class(),
            FailureClass::Unknown
        );
    }

    #[test]
    fn test_exhausted_keeps_inner_class() {
        let err = RpcError::RetriesExhausted {
            attempts: 4,
            last: Box::new(RpcError::RateLimited {
                endpoint: "p".to_string(),
                message: "slow down".to_string(),
            }),
        };
        assert_eq!(err.class(), FailureClass::RateLimit);
        assert!(err.is_retryable());
        assert_eq!(err.message(), "slow down");

        let failure = ItemFailure::from_error("sig1", &err);
        assert_eq!(failure.class, FailureClass::RateLimit);
        assert!(failure.to_string().starts_with("sig1 [rate_limit]"));
    }

    #[test]
    fn test_string_conversion_uses_message_rules() {
        let err: RpcError = "operation timed out".to_string().into();
        assert_eq!(err.class(), FailureClass::Transient);
    }
}
