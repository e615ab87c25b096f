/// Walks a wallet's signature list backward in time
///
/// Stops when a page comes back empty, when the signature cap is reached, or
/// when `max_consecutive_empty_pages` pages in a row add nothing new.
use super::types::WalletCursor;
use crate::config::IngestionConfig;
use crate::errors::{FailureClass, RpcError};
use crate::logger::{self, LogTag};
use crate::rpc::types::{parse_signature_list, signatures_params, METHOD_GET_SIGNATURES};
use crate::rpc::{RpcConnection, SignatureInfo};
use crate::utils::format_address_short;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct SignaturePage {
    /// New signatures only, newest first as the provider returns them
    pub signatures: Vec<SignatureInfo>,
    pub cursor: WalletCursor,
    pub done: bool,
    /// Served by the fallback endpoint
    pub used_fallback: bool,
}

pub struct SignaturePaginator {
    connection: RpcConnection,
    max_signatures: usize,
    max_consecutive_empty_pages: u32,
    seen: HashSet<String>,
    total: usize,
    consecutive_empty: u32,
    pages: usize,
}

impl SignaturePaginator {
    pub fn new(connection: RpcConnection, config: &IngestionConfig) -> Self {
        Self {
            connection,
            max_signatures: config.max_signatures,
            max_consecutive_empty_pages: config.max_consecutive_empty_pages.max(1),
            seen: HashSet::new(),
            total: 0,
            consecutive_empty: 0,
            pages: 0,
        }
    }

    pub fn total_signatures(&self) -> usize {
        self.total
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    pub async fn next_page(&mut self, cursor: &WalletCursor) -> Result<SignaturePage, RpcError> {
        let mut next = cursor.clone();
        let remaining = self.max_signatures.saturating_sub(self.total);

        if cursor.exhausted || remaining == 0 {
            next.exhausted = true;
            return Ok(SignaturePage {
                signatures: Vec::new(),
                cursor: next,
                done: true,
                used_fallback: false,
            });
        }

        let limit = cursor.page_size.min(remaining).max(1);
        let (page, used_fallback) = self
            .fetch(&cursor.wallet_address, limit, cursor.before_signature.as_deref())
            .await?;
        self.pages += 1;

        if page.is_empty() {
            logger::debug(
                LogTag::Ingest,
                &format!(
                    "{}: empty page, history exhausted after {} signatures",
                    format_address_short(&cursor.wallet_address),
                    self.total
                ),
            );
            next.exhausted = true;
            return Ok(SignaturePage {
                signatures: Vec::new(),
                cursor: next,
                done: true,
                used_fallback,
            });
        }

        // Oldest entry becomes the next `before`
        if let Some(oldest) = page.last() {
            next.before_signature = Some(oldest.signature.clone());
        }

        let mut fresh: Vec<SignatureInfo> = page
            .into_iter()
            .filter(|info| self.seen.insert(info.signature.clone()))
            .collect();
        fresh.truncate(remaining);

        if fresh.is_empty() {
            self.consecutive_empty += 1;
        } else {
            self.consecutive_empty = 0;
        }
        self.total += fresh.len();

        let capped = self.total >= self.max_signatures;
        let stalled = self.consecutive_empty >= self.max_consecutive_empty_pages;
        if capped {
            logger::warning(
                LogTag::Ingest,
                &format!(
                    "{}: signature cap of {} reached, older history skipped",
                    format_address_short(&cursor.wallet_address),
                    self.max_signatures
                ),
            );
        }
        if stalled {
            logger::warning(
                LogTag::Ingest,
                &format!(
                    "{}: {} pages in a row without new signatures, stopping",
                    format_address_short(&cursor.wallet_address),
                    self.consecutive_empty
                ),
            );
        }

        let done = capped || stalled;
        next.exhausted = done;
        Ok(SignaturePage {
            signatures: fresh,
            cursor: next,
            done,
            used_fallback,
        })
    }

    /// Primary with backoff; one fallback attempt unless the primary failure
    /// was non-retryable
    async fn fetch(
        &self,
        address: &str,
        limit: usize,
        before: Option<&str>,
    ) -> Result<(Vec<SignatureInfo>, bool), RpcError> {
        let params = signatures_params(address, limit, before, &self.connection.commitment);
        let label = format!("getSignaturesForAddress {}", format_address_short(address));

        let primary_error = match self
            .connection
            .call_with_backoff(
                self.connection.primary.as_ref(),
                &label,
                METHOD_GET_SIGNATURES,
                params.clone(),
                self.connection.max_retries,
                self.connection.initial_delay,
            )
            .await
        {
            Ok(result) => return Ok((parse_signature_list(&result)?, false)),
            Err(e) => e,
        };

        let fallback = match &self.connection.fallback {
            Some(fallback) if primary_error.class() != FailureClass::NonRetryable => fallback,
            _ => return Err(primary_error),
        };

        logger::warning(
            LogTag::Ingest,
            &format!(
                "{} failed on primary ({}), trying fallback {}",
                label,
                primary_error,
                fallback.endpoint()
            ),
        );

        match self
            .connection
            .call_once(fallback.as_ref(), METHOD_GET_SIGNATURES, params)
            .await
        {
            Ok(result) => Ok((parse_signature_list(&result)?, true)),
            Err(fallback_error) => {
                logger::error(
                    LogTag::Ingest,
                    &format!("{} failed on fallback too: {}", label, fallback_error),
                );
                Err(primary_error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RpcConfig;
    use crate::rpc::testing::{signature_page, MockReply, MockTransport};
    use crate::rpc::RpcConnectionFactory;
    use serde_json::json;
    use std::sync::Arc;

    fn connection(primary: Arc<MockTransport>, fallback: Option<Arc<MockTransport>>) -> RpcConnection {
        let mut config = RpcConfig::default();
        config.max_retries = 2;
        config.initial_retry_delay_ms = 10;
        config.min_request_interval_ms = 0;
        let fallback = fallback.map(|f| f as Arc<dyn crate::rpc::RpcTransport>);
        RpcConnectionFactory::with_transports(config, primary, fallback)
            .connect()
            .unwrap()
    }

    fn ingestion(page_size: usize, max_signatures: usize) -> IngestionConfig {
        IngestionConfig {
            page_size,
            max_signatures,
            ..IngestionConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_first_page_is_done() {
        let mock = Arc::new(MockTransport::new("primary"));
        mock.enqueue(METHOD_GET_SIGNATURES, MockReply::Result(json!([])));
        let mut paginator = SignaturePaginator::new(connection(mock, None), &ingestion(50, 5000));

        let page = paginator.next_page(&WalletCursor::new("W", 50)).await.unwrap();
        assert!(page.done);
        assert!(page.signatures.is_empty());
        assert!(page.cursor.exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cursor_moves_backward() {
        let mock = Arc::new(MockTransport::new("primary"));
        mock.enqueue(METHOD_GET_SIGNATURES, MockReply::Result(signature_page(&[("s3", 30), ("s2", 20)])));
        mock.enqueue(METHOD_GET_SIGNATURES, MockReply::Result(signature_page(&[("s1", 10)])));
        mock.enqueue(METHOD_GET_SIGNATURES, MockReply::Result(json!([])));
        let mut paginator = SignaturePaginator::new(connection(mock.clone(), None), &ingestion(2, 5000));

        let mut cursor = WalletCursor::new("W", 2);
        let first = paginator.next_page(&cursor).await.unwrap();
        assert_eq!(first.cursor.before_signature.as_deref(), Some("s2"));
        assert!(!first.done);
        cursor = first.cursor;

        let second = paginator.next_page(&cursor).await.unwrap();
        assert_eq!(second.signatures.len(), 1);
        cursor = second.cursor;

        let third = paginator.next_page(&cursor).await.unwrap();
        assert!(third.done);
        assert_eq!(paginator.total_signatures(), 3);

        let calls = mock.calls();
        assert!(calls[0].params[1].get("before").is_none());
        assert_eq!(calls[1].params[1]["before"], "s2");
        assert_eq!(calls[2].params[1]["before"], "s1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cap_forces_done() {
        let mock = Arc::new(MockTransport::new("primary"));
        mock.set_default(
            METHOD_GET_SIGNATURES,
            MockReply::Result(signature_page(&[("a", 3), ("b", 2), ("c", 1)])),
        );
        let mut paginator = SignaturePaginator::new(connection(mock.clone(), None), &ingestion(3, 2));

        let page = paginator.next_page(&WalletCursor::new("W", 3)).await.unwrap();
        assert!(page.done);
        assert_eq!(page.signatures.len(), 2);
        assert_eq!(mock.calls()[0].params[1]["limit"], 2);

        let after = paginator.next_page(&page.cursor).await.unwrap();
        assert!(after.done);
        assert_eq!(mock.call_count(METHOD_GET_SIGNATURES), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_pages_terminate() {
        let mock = Arc::new(MockTransport::new("primary"));
        mock.set_default(METHOD_GET_SIGNATURES, MockReply::Result(signature_page(&[("same", 1)])));
        let mut config = ingestion(1, 5000);
        config.max_consecutive_empty_pages = 3;
        let mut paginator = SignaturePaginator::new(connection(mock.clone(), None), &config);

        let mut cursor = WalletCursor::new("W", 1);
        let mut pages = 0;
        loop {
            let page = paginator.next_page(&cursor).await.unwrap();
            pages += 1;
            cursor = page.cursor;
            if page.done {
                break;
            }
        }
        assert_eq!(pages, 4);
        assert_eq!(paginator.total_signatures(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_after_retryable_failure() {
        let primary = Arc::new(MockTransport::new("primary"));
        primary.set_default(METHOD_GET_SIGNATURES, MockReply::transient());
        let fallback = Arc::new(MockTransport::new("fallback"));
        fallback.enqueue(METHOD_GET_SIGNATURES, MockReply::Result(signature_page(&[("s1", 10)])));

        let mut paginator = SignaturePaginator::new(
            connection(primary.clone(), Some(fallback.clone())),
            &ingestion(50, 5000),
        );
        let page = paginator.next_page(&WalletCursor::new("W", 50)).await.unwrap();
        assert!(page.used_fallback);
        assert_eq!(page.signatures[0].signature, "s1");
        assert_eq!(primary.call_count(METHOD_GET_SIGNATURES), 3);
        assert_eq!(fallback.call_count(METHOD_GET_SIGNATURES), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_fallback_for_non_retryable() {
        let primary = Arc::new(MockTransport::new("primary"));
        primary.set_default(METHOD_GET_SIGNATURES, MockReply::non_retryable());
        let fallback = Arc::new(MockTransport::new("fallback"));

        let mut paginator = SignaturePaginator::new(
            connection(primary.clone(), Some(fallback.clone())),
            &ingestion(50, 5000),
        );
        let err = paginator.next_page(&WalletCursor::new("W", 50)).await.unwrap_err();
        assert_eq!(err.class(), FailureClass::NonRetryable);
        assert_eq!(primary.call_count(METHOD_GET_SIGNATURES), 1);
        assert_eq!(fallback.call_count(METHOD_GET_SIGNATURES), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fallback_propagates_primary_error() {
        let primary = Arc::new(MockTransport::new("primary"));
        primary.set_default(METHOD_GET_SIGNATURES, MockReply::rate_limited());
        let fallback = Arc::new(MockTransport::new("fallback"));
        fallback.set_default(METHOD_GET_SIGNATURES, MockReply::transient());

        let mut paginator = SignaturePaginator::new(
            connection(primary, Some(fallback.clone())),
            &ingestion(50, 5000),
        );
        let err = paginator.next_page(&WalletCursor::new("W", 50)).await.unwrap_err();
        assert!(matches!(err, RpcError::RetriesExhausted { .. }));
        assert_eq!(err.class(), FailureClass::RateLimit);
        assert_eq!(fallback.call_count(METHOD_GET_SIGNATURES), 1);
    }
}
