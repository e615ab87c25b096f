//! Wallet transaction ingestion
//!
//! - `paginator`: signature pages, newest to oldest, with fallback and caps
//! - `fetcher`: bounded-concurrency detail fetch with per-item retries
//! - `classifier` / `derivatives`: one classified record per raw transaction
//! - `ingest`: the per-wallet pipeline tying them together

pub mod classifier;
pub mod derivatives;
pub mod fetcher;
pub mod ingest;
pub mod paginator;
pub mod program_ids;
pub mod types;

pub use classifier::{AssetMeta, AssetMetadata, NoAssetMetadata, StaticAssetMetadata, TransactionClassifier};
pub use fetcher::{DetailFetcher, FetchedBatch, FetcherConfig};
pub use ingest::{CancelFlag, IngestOptions, IngestSummary, IngestUpdate, WalletIngestor};
pub use paginator::{SignaturePage, SignaturePaginator};
pub use types::{
    BatchProgress, ClassifiedTransaction, DerivativeEvent, DerivativeKind, RawTransaction, SwapSide,
    TransactionType, WalletCursor,
};
