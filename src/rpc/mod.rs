//! JSON-RPC plumbing
//!
//! - `transport`: one request, one response, failures classified
//! - `rate_limiter`: minimum spacing shared by every call on a connection
//! - `backoff`: retry executor with doubling delays and rate-limit status events
//! - `connection`: factory that wires the above together; reset = build anew
//! - `testing` (tests only): scripted transport and transaction fixtures

pub mod backoff;
pub mod connection;
pub mod rate_limiter;
#[cfg(test)]
pub mod testing;
pub mod transport;
pub mod types;

pub use backoff::{BackoffExecutor, RateLimitStatus};
pub use connection::{RpcConnection, RpcConnectionFactory};
pub use rate_limiter::RateLimiter;
pub use transport::{HttpRpcTransport, RpcTransport};
pub use types::SignatureInfo;
