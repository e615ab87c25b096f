//! Wallet ingestion pipeline
//!
//! Paginator -> detail fetcher -> classifier, one page at a time. Each page
//! becomes a `Batch` update sorted oldest-first; `Finished` carries the whole
//! de-duplicated history in ascending timestamp order. The cache short-circuits
//! the run unless a refresh is requested.
//!
//! Cancellation is checked between pages and after each fetch. A cancelled run
//! emits nothing from the page it was working on and writes nothing to cache.

use super::classifier::TransactionClassifier;
use super::fetcher::{DetailFetcher, FetcherConfig};
use super::paginator::SignaturePaginator;
use super::types::{sort_chronologically, BatchProgress, ClassifiedTransaction, WalletCursor};
use crate::arguments::is_debug_ingest_enabled;
use crate::cache::CacheStore;
use crate::config::IngestionConfig;
use crate::errors::{ItemFailure, WalletLedgerError};
use crate::logger::{self, LogTag};
use crate::rpc::backoff::RateLimitStatus;
use crate::rpc::{RpcConnection, RpcConnectionFactory};
use crate::utils::{format_address_short, validate_wallet_address};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

const UPDATE_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone)]
pub enum IngestUpdate {
    Progress(BatchProgress),
    /// One page worth of classified transactions, oldest first
    Batch(Vec<ClassifiedTransaction>),
    ItemFailures(Vec<ItemFailure>),
    RateLimited(RateLimitStatus),
    Finished(IngestSummary),
    Failed {
        wallet: String,
        error: WalletLedgerError,
    },
}

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub wallet: String,
    /// Ascending by timestamp, ties by signature
    pub transactions: Vec<ClassifiedTransaction>,
    pub failures: Vec<ItemFailure>,
    pub pages: usize,
    pub from_cache: bool,
    /// Stopped at the signature cap rather than the end of history
    pub capped: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_same(&self, other: &CancelFlag) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Ignore cached history
    pub refresh: bool,
    /// Resume from here instead of the newest signature
    pub cursor: Option<WalletCursor>,
}

// =============================================================================
// INGESTOR
// =============================================================================

pub struct WalletIngestor {
    factory: Arc<RpcConnectionFactory>,
    config: IngestionConfig,
    classifier: TransactionClassifier,
    cache: Arc<CacheStore>,
    own_wallets: HashSet<String>,
}

impl WalletIngestor {
    pub fn new(
        factory: Arc<RpcConnectionFactory>,
        config: IngestionConfig,
        classifier: TransactionClassifier,
        cache: Arc<CacheStore>,
        own_wallets: HashSet<String>,
    ) -> Self {
        Self {
            factory,
            config,
            classifier,
            cache,
            own_wallets,
        }
    }

    pub fn own_wallets(&self) -> &HashSet<String> {
        &self.own_wallets
    }

    /// Spawn a run and stream its updates. The last update is always
    /// `Finished` or `Failed`.
    pub fn ingest_wallet(
        self: &Arc<Self>,
        address: &str,
        options: IngestOptions,
        cancel: CancelFlag,
    ) -> (mpsc::Receiver<IngestUpdate>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let ingestor = Arc::clone(self);
        let address = address.to_string();

        let handle = tokio::spawn(async move {
            let final_update = match ingestor.run(&address, options, &cancel, &tx).await {
                Ok(summary) => IngestUpdate::Finished(summary),
                Err(error) => IngestUpdate::Failed {
                    wallet: address.clone(),
                    error,
                },
            };
            // Receiver gone means nobody is listening any more
            let _ = tx.send(final_update).await;
        });

        (rx, handle)
    }

    /// Run to completion, sending progress, batches and failures on `updates`
    pub async fn run(
        &self,
        address: &str,
        options: IngestOptions,
        cancel: &CancelFlag,
        updates: &mpsc::Sender<IngestUpdate>,
    ) -> Result<IngestSummary, WalletLedgerError> {
        let address = validate_wallet_address(address)?;
        let short = format_address_short(address);
        let cache_key = self.cache.transactions_key(address);
        let resuming = options.cursor.is_some();

        // A resumed run covers only part of history; the cache holds all of it
        if !options.refresh && !resuming {
            if let Some(cached) = self.cache.get::<Vec<ClassifiedTransaction>>(&cache_key) {
                logger::info(
                    LogTag::Ingest,
                    &format!("{}: {} transactions from cache", short, cached.len()),
                );
                let progress = BatchProgress {
                    total_estimate: cached.len(),
                    processed: cached.len(),
                    current_batch_index: 1,
                    complete: true,
                };
                send(updates, IngestUpdate::Batch(cached.clone())).await;
                send(updates, IngestUpdate::Progress(progress)).await;
                return Ok(IngestSummary {
                    wallet: address.to_string(),
                    transactions: cached,
                    failures: Vec::new(),
                    pages: 0,
                    from_cache: true,
                    capped: false,
                });
            }
        }

        let connection = self.factory.connect()?;
        let forwarder = spawn_status_forwarder(connection.executor.subscribe(), updates.clone());
        let result = self
            .run_pages(address, options.cursor, connection, cancel, updates)
            .await;
        forwarder.abort();

        let summary = result?;
        let to_cache = if resuming {
            let cached = self
                .cache
                .get::<Vec<ClassifiedTransaction>>(&cache_key)
                .unwrap_or_default();
            merge_history(cached, &summary.transactions)
        } else {
            summary.transactions.clone()
        };
        self.cache
            .save(&cache_key, &to_cache)
            .map_err(WalletLedgerError::Persistence)?;

        logger::info(
            LogTag::Ingest,
            &format!(
                "{}: ingested {} transactions over {} pages ({} failed)",
                short,
                summary.transactions.len(),
                summary.pages,
                summary.failures.len()
            ),
        );
        Ok(summary)
    }

    async fn run_pages(
        &self,
        address: &str,
        cursor: Option<WalletCursor>,
        connection: RpcConnection,
        cancel: &CancelFlag,
        updates: &mpsc::Sender<IngestUpdate>,
    ) -> Result<IngestSummary, WalletLedgerError> {
        let mut paginator = SignaturePaginator::new(connection.clone(), &self.config);
        let fetcher = DetailFetcher::new(connection, FetcherConfig::from(&self.config));
        let mut cursor = cursor.unwrap_or_else(|| WalletCursor::new(address, self.config.page_size));

        let mut history: Vec<ClassifiedTransaction> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut failures: Vec<ItemFailure> = Vec::new();
        let mut progress = BatchProgress::default();
        let cancelled = || WalletLedgerError::Cancelled {
            wallet: address.to_string(),
        };

        loop {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }

            let page = paginator.next_page(&cursor).await?;
            cursor = page.cursor;

            if !page.signatures.is_empty() {
                let block_times: HashMap<&str, Option<i64>> = page
                    .signatures
                    .iter()
                    .map(|info| (info.signature.as_str(), info.block_time))
                    .collect();
                let signatures: Vec<String> =
                    page.signatures.iter().map(|info| info.signature.clone()).collect();

                let fetched = fetcher.fetch_batch(&signatures).await;
                if cancel.is_cancelled() {
                    return Err(cancelled());
                }

                let mut batch: Vec<ClassifiedTransaction> = fetched
                    .transactions
                    .into_iter()
                    .filter(|raw| seen.insert(raw.signature.clone()))
                    .map(|mut raw| {
                        if raw.block_time.is_none() {
                            raw.block_time = block_times.get(raw.signature.as_str()).copied().flatten();
                        }
                        self.classifier.classify(&raw, address, &self.own_wallets)
                    })
                    .collect();
                sort_chronologically(&mut batch);

                progress.current_batch_index += 1;
                progress.processed += signatures.len();
                progress.total_estimate = if page.done {
                    progress.processed
                } else {
                    (progress.processed + cursor.page_size).min(self.config.max_signatures)
                };

                if is_debug_ingest_enabled() {
                    logger::debug(
                        LogTag::Ingest,
                        &format!(
                            "{}: batch {} classified {} ({} failed)",
                            format_address_short(address),
                            progress.current_batch_index,
                            batch.len(),
                            fetched.failures.len()
                        ),
                    );
                }

                send(updates, IngestUpdate::Batch(batch.clone())).await;
                if !fetched.failures.is_empty() {
                    send(updates, IngestUpdate::ItemFailures(fetched.failures.clone())).await;
                }
                send(updates, IngestUpdate::Progress(progress.clone())).await;

                history.extend(batch);
                failures.extend(fetched.failures);
            }

            if page.done {
                break;
            }
        }

        sort_chronologically(&mut history);
        progress.complete = true;
        progress.total_estimate = progress.processed;
        send(updates, IngestUpdate::Progress(progress)).await;

        Ok(IngestSummary {
            wallet: address.to_string(),
            transactions: history,
            failures,
            pages: paginator.pages_fetched(),
            from_cache: false,
            capped: paginator.total_signatures() >= self.config.max_signatures,
        })
    }

    /// Native balance, cached under `{prefix}{wallet}`
    pub async fn get_wallet_balance(&self, address: &str, refresh: bool) -> Result<u64, WalletLedgerError> {
        let address = validate_wallet_address(address)?;
        let key = self.cache.wallet_key(address);
        if !refresh {
            if let Some(balance) = self.cache.get::<u64>(&key) {
                return Ok(balance);
            }
        }
        let connection = self.factory.connect()?;
        let balance = connection.get_balance(address).await?;
        self.cache
            .save(&key, &balance)
            .map_err(WalletLedgerError::Persistence)?;
        Ok(balance)
    }
}

/// Fold a resumed run into earlier history, one entry per signature
fn merge_history(
    mut history: Vec<ClassifiedTransaction>,
    resumed: &[ClassifiedTransaction],
) -> Vec<ClassifiedTransaction> {
    let mut seen: HashSet<String> = history.iter().map(|t| t.signature.clone()).collect();
    history.extend(
        resumed
            .iter()
            .filter(|t| seen.insert(t.signature.clone()))
            .cloned(),
    );
    sort_chronologically(&mut history);
    history
}

async fn send(updates: &mpsc::Sender<IngestUpdate>, update: IngestUpdate) {
    if updates.send(update).await.is_err() {
        logger::debug(LogTag::Ingest, "Update receiver dropped");
    }
}

fn spawn_status_forwarder(
    mut statuses: broadcast::Receiver<RateLimitStatus>,
    updates: mpsc::Sender<IngestUpdate>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match statuses.recv().await {
                Ok(status) => {
                    if updates.send(IngestUpdate::RateLimited(status)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
