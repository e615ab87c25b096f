/// Resolves full transaction bodies for a page of signatures
///
/// Each signature is fetched on its own through the backoff executor. Up to
/// `fan_out` requests are in flight at once; the connection's rate limiter
/// still spaces them globally. One signature failing never fails the batch.
use super::types::RawTransaction;
use crate::config::IngestionConfig;
use crate::errors::{ItemFailure, RpcError};
use crate::logger::{self, LogTag};
use crate::rpc::types::{transaction_params, METHOD_GET_TRANSACTION};
use crate::rpc::RpcConnection;
use crate::utils::format_signature_short;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::time::Duration;

// =============================================================================
// CONFIGURATION
// =============================================================================

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Pause before each request
    pub request_delay: Duration,
    pub fan_out: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self::from(&IngestionConfig::default())
    }
}

impl From<&IngestionConfig> for FetcherConfig {
    fn from(config: &IngestionConfig) -> Self {
        Self {
            max_retries: config.detail_max_retries,
            retry_delay: config.detail_retry_delay(),
            request_delay: config.detail_request_delay(),
            fan_out: config.fan_out(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchedBatch {
    /// In input order, failures omitted
    pub transactions: Vec<RawTransaction>,
    pub failures: Vec<ItemFailure>,
}

// =============================================================================
// FETCHER
// =============================================================================

pub struct DetailFetcher {
    connection: RpcConnection,
    config: FetcherConfig,
}

impl DetailFetcher {
    pub fn new(connection: RpcConnection, config: FetcherConfig) -> Self {
        Self { connection, config }
    }

    pub async fn fetch_batch(&self, signatures: &[String]) -> FetchedBatch {
        let results: Vec<(String, Result<RawTransaction, RpcError>)> = stream::iter(signatures.iter().cloned())
            .map(|signature| async move {
                let result = self.fetch_one(&signature).await;
                (signature, result)
            })
            .buffered(self.config.fan_out.max(1))
            .collect()
            .await;

        let mut batch = FetchedBatch::default();
        for (signature, result) in results {
            match result {
                Ok(raw) => batch.transactions.push(raw),
                Err(e) => {
                    logger::warning(
                        LogTag::Ingest,
                        &format!("Skipping {}: {}", format_signature_short(&signature), e),
                    );
                    batch.failures.push(ItemFailure::from_error(&signature, &e));
                }
            }
        }

        logger::debug(
            LogTag::Ingest,
            &format!(
                "Fetched {}/{} transactions ({} failed)",
                batch.transactions.len(),
                signatures.len(),
                batch.failures.len()
            ),
        );
        batch
    }

    async fn fetch_one(&self, signature: &str) -> Result<RawTransaction, RpcError> {
        if !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }

        let label = format!("getTransaction {}", format_signature_short(signature));
        let transport = self.connection.primary.as_ref();
        let value = self
            .connection
            .executor
            .execute(&label, self.config.max_retries, self.config.retry_delay, || async move {
                let result = self
                    .connection
                    .call_once(
                        transport,
                        METHOD_GET_TRANSACTION,
                        transaction_params(signature, &self.connection.commitment),
                    )
                    .await?;
                // Not yet visible on this node; worth another try
                if result.is_null() {
                    return Err(RpcError::Transient {
                        endpoint: transport.endpoint().to_string(),
                        message: "transaction not found".to_string(),
                    });
                }
                Ok::<Value, RpcError>(result)
            })
            .await?;

        Ok(RawTransaction::from_rpc_value(signature, &value))
    }
}
