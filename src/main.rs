use anyhow::{bail, Context};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use walletledger::{
    arguments::{get_arg_value, get_arg_values, patterns, print_help},
    cache::CacheStore,
    config::{self, CONFIG_FILE_PATH},
    constants::{SOL_DECIMALS, SOL_MINT},
    ledger::{fifo_ledger, native_asset_delta, report, PriceTable, TaxSummary},
    logger::{self, LogTag},
    persistence::{PersistenceSink, SqliteSink},
    queue::{EnqueueOutcome, QueueEvent, WalletQueue},
    rpc::RpcConnectionFactory,
    transactions::{
        IngestOptions, IngestSummary, IngestUpdate, StaticAssetMetadata, TransactionClassifier,
        WalletIngestor,
    },
    utils::{format_address_short, lamports_to_sol},
};

/// Headless run: ingest every `--wallet` through the queue, persist the
/// history, then compute and print the FIFO ledger when a price table is given.
#[tokio::main]
async fn main() {
    logger::init();

    if patterns::is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    let code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            logger::error(LogTag::System, &format!("{:#}", e));
            1
        }
    };
    logger::flush();
    std::process::exit(code);
}

async fn run() -> anyhow::Result<()> {
    let config_path = get_arg_value("--config").unwrap_or_else(|| CONFIG_FILE_PATH.to_string());
    config::load_config_from_path(&config_path).context("loading configuration")?;
    let cfg = config::get_config_clone();

    let wallets = get_arg_values("--wallet");
    if wallets.is_empty() {
        print_help();
        bail!("no wallet given, pass --wallet <ADDRESS>");
    }

    let own_wallets: HashSet<String> = cfg
        .wallets
        .own_wallets
        .iter()
        .cloned()
        .chain(get_arg_values("--own"))
        .chain(wallets.iter().cloned())
        .collect();

    let cache = Arc::new(CacheStore::new(&cfg.cache));
    let metadata = StaticAssetMetadata::new().with(SOL_MINT, "wSOL", SOL_DECIMALS);
    let classifier = TransactionClassifier::new(cfg.classifier.dust_threshold_lamports, Arc::new(metadata));
    let ingestor = Arc::new(WalletIngestor::new(
        Arc::new(RpcConnectionFactory::new(cfg.rpc.clone())),
        cfg.ingestion.clone(),
        classifier,
        cache.clone(),
        own_wallets,
    ));

    let sink: Option<Arc<dyn PersistenceSink>> = if cfg.persistence.enabled && !patterns::is_dry_run() {
        let sink = SqliteSink::open(&cfg.persistence.database_path).context("opening transaction database")?;
        Some(Arc::new(sink))
    } else {
        logger::info(LogTag::Persistence, "Persistence disabled for this run");
        None
    };

    let options = IngestOptions {
        refresh: patterns::is_refresh_requested(),
        cursor: None,
    };
    let (queue, mut events) = WalletQueue::new(ingestor.clone(), sink, options);

    let mut accepted = 0usize;
    for wallet in &wallets {
        match queue.enqueue(wallet) {
            Ok(EnqueueOutcome::Started) | Ok(EnqueueOutcome::Queued(_)) => accepted += 1,
            Ok(_) => {}
            Err(e) => logger::error(LogTag::System, &format!("Skipping wallet: {}", e)),
        }
    }
    if accepted == 0 {
        bail!("no valid wallet to ingest");
    }

    let mut summaries: BTreeMap<String, IngestSummary> = BTreeMap::new();
    let mut finished = 0usize;
    while finished < accepted {
        let Some(event) = events.recv().await else {
            break;
        };
        match event {
            QueueEvent::Update { wallet, update } => report_update(&wallet, &update),
            QueueEvent::Completed { wallet, summary } => {
                finished += 1;
                summaries.insert(wallet, summary);
            }
            QueueEvent::Failed { wallet, error } => {
                finished += 1;
                logger::error(
                    LogTag::System,
                    &format!("{} not ingested: {}", format_address_short(&wallet), error),
                );
            }
            QueueEvent::Started { .. } | QueueEvent::Idle => {}
        }
    }

    if let Err(e) = cache.write_snapshot() {
        logger::warning(LogTag::Cache, &format!("Cache snapshot not written: {}", e));
    }

    for wallet in summaries.keys() {
        match ingestor.get_wallet_balance(wallet, false).await {
            Ok(lamports) => logger::info(
                LogTag::System,
                &format!("{} balance: {:.4} SOL", format_address_short(wallet), lamports_to_sol(lamports as i64)),
            ),
            Err(e) => logger::warning(
                LogTag::System,
                &format!("{} balance unavailable: {}", format_address_short(wallet), e),
            ),
        }
    }

    let Some(prices_path) = get_arg_value("--prices") else {
        logger::info(LogTag::Ledger, "No --prices table given, skipping cost-basis ledger");
        return Ok(());
    };
    let prices = PriceTable::from_path(Path::new(&prices_path)).context("loading price table")?;

    for (wallet, summary) in &summaries {
        let output = fifo_ledger(&summary.transactions, native_asset_delta, &prices, &cfg.ledger)
            .with_context(|| format!("ledger for {}", wallet))?;
        let tax = TaxSummary::from_events(&output.realized_events, &cfg.ledger);

        println!("\n{} ({} transactions)", wallet, summary.transactions.len());
        if !output.realized_events.is_empty() {
            println!("{}", report::realized_table(&output.realized_events));
        }
        println!("{}", report::summary_table(&output, &tax));
    }
    Ok(())
}

fn report_update(wallet: &str, update: &IngestUpdate) {
    let short = format_address_short(wallet);
    match update {
        IngestUpdate::Progress(progress) => logger::info(
            LogTag::Ingest,
            &format!(
                "{}: batch {} processed {}/{}{}",
                short,
                progress.current_batch_index,
                progress.processed,
                progress.total_estimate,
                if progress.complete { " (complete)" } else { "" }
            ),
        ),
        IngestUpdate::ItemFailures(failures) => logger::warning(
            LogTag::Ingest,
            &format!("{}: {} transactions could not be fetched", short, failures.len()),
        ),
        IngestUpdate::RateLimited(status) => logger::warning(LogTag::Rpc, &format!("{}: {}", short, status)),
        IngestUpdate::Batch(_) | IngestUpdate::Finished(_) | IngestUpdate::Failed { .. } => {}
    }
}
