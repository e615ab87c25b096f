/// Connection factory
///
/// `RpcConnectionFactory::connect()` builds a fresh `RpcConnection` with its
/// own limiter and executor. Nothing is process-wide: resetting a connection
/// means calling `connect()` again and dropping the old one.
use super::backoff::BackoffExecutor;
use super::rate_limiter::RateLimiter;
use super::transport::{HttpRpcTransport, RpcTransport};
use super::types::{balance_params, parse_balance, METHOD_GET_BALANCE};
use crate::config::RpcConfig;
use crate::errors::{FailureClass, RpcError};
use crate::logger::{self, LogTag};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

enum TransportSource {
    Http,
    Fixed {
        primary: Arc<dyn RpcTransport>,
        fallback: Option<Arc<dyn RpcTransport>>,
    },
}

pub struct RpcConnectionFactory {
    config: RpcConfig,
    source: TransportSource,
}

impl RpcConnectionFactory {
    /// HTTP transports built from `config` on every connect
    pub fn new(config: RpcConfig) -> Self {
        Self {
            config,
            source: TransportSource::Http,
        }
    }

    /// Pre-built transports, e.g. scripted mocks
    pub fn with_transports(
        config: RpcConfig,
        primary: Arc<dyn RpcTransport>,
        fallback: Option<Arc<dyn RpcTransport>>,
    ) -> Self {
        Self {
            config,
            source: TransportSource::Fixed { primary, fallback },
        }
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    pub fn connect(&self) -> Result<RpcConnection, RpcError> {
        let (primary, fallback) = match &self.source {
            TransportSource::Http => {
                let timeout = self.config.request_timeout();
                let primary: Arc<dyn RpcTransport> =
                    Arc::new(HttpRpcTransport::new(&self.config.primary_url, timeout)?);
                let fallback = if self.config.fallback_url.trim().is_empty() {
                    None
                } else {
                    Some(Arc::new(HttpRpcTransport::new(&self.config.fallback_url, timeout)?)
                        as Arc<dyn RpcTransport>)
                };
                (primary, fallback)
            }
            TransportSource::Fixed { primary, fallback } => (primary.clone(), fallback.clone()),
        };

        logger::debug(
            LogTag::Rpc,
            &format!(
                "Connected to {} (fallback: {})",
                primary.endpoint(),
                fallback.as_ref().map(|f| f.endpoint()).unwrap_or("none")
            ),
        );

        Ok(RpcConnection {
            primary,
            fallback,
            limiter: Arc::new(RateLimiter::new(self.config.min_request_interval())),
            executor: Arc::new(BackoffExecutor::default()),
            commitment: self.config.commitment.clone(),
            max_retries: self.config.max_retries,
            initial_delay: self.config.initial_retry_delay(),
        })
    }
}

/// One live connection. Cheap to clone; clones share limiter and executor.
#[derive(Clone)]
pub struct RpcConnection {
    pub primary: Arc<dyn RpcTransport>,
    pub fallback: Option<Arc<dyn RpcTransport>>,
    pub limiter: Arc<RateLimiter>,
    pub executor: Arc<BackoffExecutor>,
    pub commitment: String,
    /// Page-level retry budget
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl RpcConnection {
    /// One paced attempt; feeds the limiter's 429 tracking
    pub async fn call_once(
        &self,
        transport: &dyn RpcTransport,
        method: &str,
        params: Value,
    ) -> Result<Value, RpcError> {
        self.limiter.acquire().await;
        let result = transport.call(method, params).await;
        match &result {
            Ok(_) => self.limiter.record_success(),
            Err(e) if e.class() == FailureClass::RateLimit => self.limiter.record_rate_limited(),
            Err(_) => {}
        }
        result
    }

    /// Paced attempts wrapped in the backoff executor
    pub async fn call_with_backoff(
        &self,
        transport: &dyn RpcTransport,
        label: &str,
        method: &str,
        params: Value,
        max_retries: u32,
        initial_delay: Duration,
    ) -> Result<Value, RpcError> {
        self.executor
            .execute(label, max_retries, initial_delay, || {
                self.call_once(transport, method, params.clone())
            })
            .await
    }

    /// Native balance in lamports
    pub async fn get_balance(&self, address: &str) -> Result<u64, RpcError> {
        let result = self
            .call_with_backoff(
                self.primary.as_ref(),
                &format!("getBalance {}", crate::utils::format_address_short(address)),
                METHOD_GET_BALANCE,
                balance_params(address, &self.commitment),
                self.max_retries,
                self.initial_delay,
            )
            .await?;
        parse_balance(&result)
    }
}
