/// Transaction classification
///
/// Priority order, first match wins:
/// 1. derivative-position event (program ids / log keywords)
/// 2. gas/fee: wallet balance moved by no more than the dust threshold
/// 3. outgoing transfer: some account gained a matching amount
/// 4. incoming transfer: some account lost a matching amount
/// 5. swap: a DEX program was invoked (buy when SOL left the wallet)
/// 6. unknown
///
/// Classification is a pure function of its inputs and never fails;
/// missing keys or balances degrade to `Unknown`.
use super::derivatives::parse_derivative_event;
use super::program_ids::detect_dex;
use super::types::{
    AssetInfo, ClassifiedTransaction, RawTransaction, SwapSide, TransactionType,
};
use crate::arguments::is_debug_classify_enabled;
use crate::constants::{DEFAULT_DUST_THRESHOLD_LAMPORTS, SOL_MINT};
use crate::logger::{self, LogTag};
use crate::utils::format_signature_short;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

// =============================================================================
// ASSET METADATA
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AssetMeta {
    pub symbol: String,
    pub decimals: u8,
}

/// Symbol/decimals lookup for token mints. Best-effort: None is not an error.
pub trait AssetMetadata: Send + Sync {
    fn lookup(&self, mint: &str) -> Option<AssetMeta>;
}

/// Knows nothing
pub struct NoAssetMetadata;

impl AssetMetadata for NoAssetMetadata {
    fn lookup(&self, _mint: &str) -> Option<AssetMeta> {
        None
    }
}

/// Fixed mint table
#[derive(Debug, Clone, Default)]
pub struct StaticAssetMetadata {
    entries: HashMap<String, AssetMeta>,
}

impl StaticAssetMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, mint: &str, symbol: &str, decimals: u8) -> Self {
        self.entries.insert(
            mint.to_string(),
            AssetMeta {
                symbol: symbol.to_string(),
                decimals,
            },
        );
        self
    }
}

impl AssetMetadata for StaticAssetMetadata {
    fn lookup(&self, mint: &str) -> Option<AssetMeta> {
        self.entries.get(mint).cloned()
    }
}

// =============================================================================
// CLASSIFIER
// =============================================================================

#[derive(Clone)]
pub struct TransactionClassifier {
    dust_threshold: u64,
    metadata: Arc<dyn AssetMetadata>,
}

impl Default for TransactionClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_DUST_THRESHOLD_LAMPORTS, Arc::new(NoAssetMetadata))
    }
}

impl TransactionClassifier {
    pub fn new(dust_threshold: u64, metadata: Arc<dyn AssetMetadata>) -> Self {
        Self {
            dust_threshold,
            metadata,
        }
    }

    pub fn classify(
        &self,
        raw: &RawTransaction,
        own_address: &str,
        own_wallets: &HashSet<String>,
    ) -> ClassifiedTransaction {
        let wallet_index = raw.account_index(own_address);
        let delta = wallet_index.and_then(|index| raw.balance_delta(index));

        let mut classified = ClassifiedTransaction {
            signature: raw.signature.clone(),
            wallet_address: own_address.to_string(),
            timestamp: raw.block_time.unwrap_or(0),
            slot: raw.slot,
            transaction_type: TransactionType::Unknown,
            native_amount_delta: delta.unwrap_or(0),
            fee_amount: raw.fee,
            success: raw.success,
            counterparty_address: None,
            is_internal_transfer: false,
            asset_info: None,
        };

        let programs: Vec<&str> = raw.invoked_programs().collect();

        // 1. derivative events
        if let Some(event) = parse_derivative_event(&raw.log_messages, &programs) {
            classified.transaction_type = TransactionType::Derivative(event);
            return self.finish(classified);
        }

        let (Some(wallet_index), Some(delta)) = (wallet_index, delta) else {
            return self.finish(classified);
        };

        // 2. fee-only noise
        if delta.unsigned_abs() <= self.dust_threshold {
            classified.transaction_type = TransactionType::GasFee;
            return self.finish(classified);
        }

        // 3./4. transfer with a matching counterparty
        if let Some(counterparty) = self.find_counterparty(raw, wallet_index, delta) {
            classified.is_internal_transfer = own_wallets.contains(&counterparty);
            classified.counterparty_address = Some(counterparty);
            classified.transaction_type = TransactionType::Transfer;
            return self.finish(classified);
        }

        // 5. swap
        if let Some(venue) = programs.iter().find_map(|p| detect_dex(p)) {
            classified.transaction_type = TransactionType::Swap {
                side: if delta < 0 { SwapSide::Buy } else { SwapSide::Sell },
                venue: Some(venue.to_string()),
            };
            classified.asset_info = self.swap_asset(raw, own_address);
        }

        self.finish(classified)
    }

    /// Account whose balance moved the opposite way by `|delta|` within
    /// fee + dust. Token accounts and invoked programs are skipped: lamports
    /// landing in a pool vault are not a transfer.
    fn find_counterparty(&self, raw: &RawTransaction, wallet_index: usize, delta: i64) -> Option<String> {
        let tolerance = raw.fee.saturating_add(self.dust_threshold);
        let token_accounts: HashSet<usize> = raw
            .pre_token_balances
            .iter()
            .chain(raw.post_token_balances.iter())
            .map(|b| b.account_index)
            .collect();
        let programs: HashSet<&str> = raw.invoked_programs().collect();

        raw.account_keys
            .iter()
            .enumerate()
            .filter(|(index, key)| {
                *index != wallet_index
                    && !token_accounts.contains(index)
                    && !programs.contains(key.as_str())
            })
            .filter_map(|(index, key)| {
                let other = raw.balance_delta(index)?;
                if other == 0 || other.signum() == delta.signum() {
                    return None;
                }
                let mismatch = other.unsigned_abs().abs_diff(delta.unsigned_abs());
                (mismatch <= tolerance).then_some((mismatch, key))
            })
            .min_by_key(|(mismatch, _)| *mismatch)
            .map(|(_, key)| key.clone())
    }

    /// Largest non-wSOL token change owned by the wallet
    fn swap_asset(&self, raw: &RawTransaction, own_address: &str) -> Option<AssetInfo> {
        let mut deltas: BTreeMap<&str, (f64, u8)> = BTreeMap::new();
        for balance in raw
            .pre_token_balances
            .iter()
            .filter(|b| b.owner.as_deref() == Some(own_address))
        {
            let entry = deltas.entry(balance.mint.as_str()).or_insert((0.0, balance.decimals));
            entry.0 -= balance.ui_amount();
        }
        for balance in raw
            .post_token_balances
            .iter()
            .filter(|b| b.owner.as_deref() == Some(own_address))
        {
            let entry = deltas.entry(balance.mint.as_str()).or_insert((0.0, balance.decimals));
            entry.0 += balance.ui_amount();
        }

        let (mint, (token_delta, decimals)) = deltas
            .into_iter()
            .filter(|(mint, (delta, _))| *mint != SOL_MINT && *delta != 0.0)
            .max_by(|a, b| a.1 .0.abs().total_cmp(&b.1 .0.abs()))?;

        let meta = self.metadata.lookup(mint);
        Some(AssetInfo {
            mint: mint.to_string(),
            symbol: meta.as_ref().map(|m| m.symbol.clone()),
            decimals: Some(meta.map(|m| m.decimals).unwrap_or(decimals)),
            token_delta,
        })
    }

    fn finish(&self, classified: ClassifiedTransaction) -> ClassifiedTransaction {
        if is_debug_classify_enabled() {
            logger::debug(
                LogTag::Classify,
                &format!(
                    "{} -> {} (delta {} lamports, counterparty {:?})",
                    format_signature_short(&classified.signature),
                    classified.type_label(),
                    classified.native_amount_delta,
                    classified.counterparty_address
                ),
            );
        }
        classified
    }
}

/// Classify with the default dust threshold and no asset metadata
pub fn classify(
    raw: &RawTransaction,
    own_address: &str,
    own_wallets: &HashSet<String>,
) -> ClassifiedTransaction {
    TransactionClassifier::default().classify(raw, own_address, own_wallets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::testing::TxFixture;
    use crate::transactions::program_ids::{DRIFT_V2_PROGRAM_ID, JUPITER_V6_PROGRAM_ID, SYSTEM_PROGRAM_ID};
    use crate::transactions::types::DerivativeKind;

    const WALLET: &str = "WaLLet1111111111111111111111111111111111111";
    const OTHER: &str = "0therWa11et111111111111111111111111111111111";
    const SECOND_OWN: &str = "SecondOwn1111111111111111111111111111111111";
    const TOKEN_MINT: &str = "TokenMint111111111111111111111111111111111111";

    fn raw(fixture: TxFixture) -> RawTransaction {
        let value = fixture.to_value();
        RawTransaction::from_rpc_value("sig", &value)
    }

    fn own(addresses: &[&str]) -> HashSet<String> {
        addresses.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_outgoing_transfer() {
        let tx = raw(
            TxFixture::new("sig", 100)
                .account(WALLET, 2_000_000_000, 999_995_000)
                .account(OTHER, 0, 1_000_000_000)
                .invoke(SYSTEM_PROGRAM_ID),
        );
        let result = classify(&tx, WALLET, &own(&[WALLET]));
        assert_eq!(result.transaction_type, TransactionType::Transfer);
        assert_eq!(result.counterparty_address.as_deref(), Some(OTHER));
        assert!(!result.is_internal_transfer);
        assert_eq!(result.native_amount_delta, -1_000_005_000);
        assert_eq!(result.timestamp, 100);
    }

    #[test]
    fn test_out_of_range_balances_do_not_panic() {
        // near u64::MAX but the delta itself is tiny
        let tx = raw(
            TxFixture::new("sig", 100)
                .account(WALLET, 9_223_372_036_854_775_808, 9_223_372_036_854_775_807),
        );
        let result = classify(&tx, WALLET, &own(&[WALLET]));
        assert_eq!(result.native_amount_delta, -1);
        assert_eq!(result.transaction_type, TransactionType::GasFee);

        // delta wider than i64
        let tx = raw(
            TxFixture::new("sig", 100)
                .account(WALLET, 0, u64::MAX)
                .account(OTHER, u64::MAX, 0),
        );
        let result = classify(&tx, WALLET, &own(&[WALLET]));
        assert_eq!(result.native_amount_delta, 0);
        assert_eq!(result.transaction_type, TransactionType::Unknown);

        // counterparty search across extreme but representable deltas
        let tx = raw(
            TxFixture::new("sig", 100)
                .account(WALLET, 0, i64::MAX as u64)
                .account(OTHER, i64::MAX as u64, 0)
                .account(SECOND_OWN, u64::MAX, u64::MAX - (i64::MAX as u64) - 1),
        );
        let result = classify(&tx, WALLET, &own(&[WALLET]));
        assert_eq!(result.transaction_type, TransactionType::Transfer);
        assert_eq!(result.counterparty_address.as_deref(), Some(OTHER));
    }

    #[test]
    fn test_internal_transfer_flag() {
        let tx = raw(
            TxFixture::new("sig", 100)
                .account(WALLET, 2_000_000_000, 999_995_000)
                .account(SECOND_OWN, 0, 1_000_000_000),
        );
        let result = classify(&tx, WALLET, &own(&[WALLET, SECOND_OWN]));
        assert_eq!(result.transaction_type, TransactionType::Transfer);
        assert!(result.is_internal_transfer);
        assert_eq!(result.type_label(), "internal_transfer");
    }

    #[test]
    fn test_incoming_transfer() {
        let tx = raw(
            TxFixture::new("sig", 100)
                .account(OTHER, 3_000_000_000, 1_999_995_000)
                .account(WALLET, 0, 1_000_000_000),
        );
        let result = classify(&tx, WALLET, &own(&[WALLET]));
        assert_eq!(result.transaction_type, TransactionType::Transfer);
        assert_eq!(result.counterparty_address.as_deref(), Some(OTHER));
        assert_eq!(result.native_amount_delta, 1_000_000_000);
    }

    #[test]
    fn test_dust_is_gas_fee() {
        let tx = raw(TxFixture::new("sig", 100).account(WALLET, 1_000_000, 995_000));
        let result = classify(&tx, WALLET, &own(&[WALLET]));
        assert_eq!(result.transaction_type, TransactionType::GasFee);
    }

    #[test]
    fn test_derivative_beats_everything() {
        let tx = raw(
            TxFixture::new("sig", 100)
                .account(WALLET, 1_000_000, 995_000)
                .invoke(DRIFT_V2_PROGRAM_ID)
                .log("Program log: Instruction: OpenPosition")
                .log("Program log: market=SOL-PERP side=long size=2"),
        );
        let result = classify(&tx, WALLET, &own(&[WALLET]));
        match result.transaction_type {
            TransactionType::Derivative(event) => {
                assert_eq!(event.kind, DerivativeKind::Open);
                assert_eq!(event.size, 2.0);
            }
            other => panic!("expected derivative, got {:?}", other),
        }
    }

    #[test]
    fn test_swap_buy_with_token_leg() {
        let metadata = StaticAssetMetadata::new().with(TOKEN_MINT, "TKN", 6);
        let classifier = TransactionClassifier::new(5_000, Arc::new(metadata));
        // SOL goes into a wSOL vault (a token account), so no transfer match
        let tx = raw(
            TxFixture::new("sig", 100)
                .account(WALLET, 2_000_000_000, 1_499_995_000)
                .account("WalletTokenAcct", 2_039_280, 2_039_280)
                .account("PoolWsolVault", 10_000_000_000, 10_500_000_000)
                .invoke(JUPITER_V6_PROGRAM_ID)
                .token_balance(1, TOKEN_MINT, WALLET, 0, 1_250_000, 6)
                .token_balance(2, SOL_MINT, "PoolAuthority", 10_000_000_000, 10_500_000_000, 9),
        );
        let result = classifier.classify(&tx, WALLET, &own(&[WALLET]));
        assert_eq!(
            result.transaction_type,
            TransactionType::Swap {
                side: SwapSide::Buy,
                venue: Some("jupiter".to_string())
            }
        );
        let asset = result.asset_info.unwrap();
        assert_eq!(asset.mint, TOKEN_MINT);
        assert_eq!(asset.symbol.as_deref(), Some("TKN"));
        assert_eq!(asset.token_delta, 1.25);
    }

    #[test]
    fn test_swap_sell_unresolved_asset_is_fine() {
        let tx = raw(
            TxFixture::new("sig", 100)
                .account(WALLET, 1_000_000_000, 1_700_000_000)
                .invoke(JUPITER_V6_PROGRAM_ID),
        );
        let result = classify(&tx, WALLET, &own(&[WALLET]));
        assert_eq!(result.transaction_type.label(), "swap_sell");
        assert!(result.asset_info.is_none());
    }

    #[test]
    fn test_missing_fields_degrade_to_unknown() {
        let tx = raw(TxFixture::new("sig", 100).account(OTHER, 5, 6));
        let result = classify(&tx, WALLET, &own(&[WALLET]));
        assert_eq!(result.transaction_type, TransactionType::Unknown);

        let empty = RawTransaction::from_rpc_value("sig", &serde_json::Value::Null);
        let result = classify(&empty, WALLET, &own(&[WALLET]));
        assert_eq!(result.transaction_type, TransactionType::Unknown);
        assert_eq!(result.timestamp, 0);
    }

    #[test]
    fn test_large_move_without_match_or_dex_is_unknown() {
        let tx = raw(
            TxFixture::new("sig", 100)
                .account(WALLET, 5_000_000_000, 1_000_000_000)
                .account(OTHER, 0, 100),
        );
        assert_eq!(classify(&tx, WALLET, &own(&[WALLET])).transaction_type, TransactionType::Unknown);
    }

    #[test]
    fn test_classification_is_pure() {
        let tx = raw(
            TxFixture::new("sig", 100)
                .account(WALLET, 2_000_000_000, 999_995_000)
                .account(OTHER, 0, 1_000_000_000),
        );
        let set = own(&[WALLET]);
        assert_eq!(classify(&tx, WALLET, &set), classify(&tx, WALLET, &set));
    }
}
