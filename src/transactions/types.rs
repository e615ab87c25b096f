/// Transaction data model: provider bodies, classified records, ingestion cursors
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// RAW TRANSACTION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub account_index: usize,
    pub mint: String,
    pub owner: Option<String>,
    /// Raw base units
    pub amount: u64,
    pub decimals: u8,
}

impl TokenBalance {
    pub fn ui_amount(&self) -> f64 {
        self.amount as f64 / 10f64.powi(self.decimals as i32)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionRef {
    pub program_id: String,
    /// Inner (CPI) instruction
    pub inner: bool,
}

/// Provider transaction body reduced to the fields classification needs.
/// Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub signature: String,
    pub slot: Option<u64>,
    pub block_time: Option<i64>,
    pub success: bool,
    pub error: Option<String>,
    pub fee: u64,
    /// Static keys followed by lookup-table writable then readonly keys
    pub account_keys: Vec<String>,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
    pub log_messages: Vec<String>,
    pub instructions: Vec<InstructionRef>,
}

impl RawTransaction {
    /// Read a getTransaction result. Never fails; absent fields come back empty.
    pub fn from_rpc_value(signature: &str, value: &Value) -> Self {
        let meta = value.get("meta").unwrap_or(&Value::Null);
        let message = value
            .get("transaction")
            .and_then(|t| t.get("message"))
            .unwrap_or(&Value::Null);

        let mut account_keys: Vec<String> = message
            .get("accountKeys")
            .and_then(Value::as_array)
            .map(|keys| keys.iter().filter_map(account_key_str).collect())
            .unwrap_or_default();

        if let Some(loaded) = meta.get("loadedAddresses") {
            for section in ["writable", "readonly"] {
                if let Some(keys) = loaded.get(section).and_then(Value::as_array) {
                    account_keys.extend(keys.iter().filter_map(account_key_str));
                }
            }
        }

        let error = meta
            .get("err")
            .filter(|e| !e.is_null())
            .map(|e| e.to_string());

        let mut instructions: Vec<InstructionRef> = message
            .get("instructions")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|ix| instruction_program(ix, &account_keys))
                    .map(|program_id| InstructionRef {
                        program_id,
                        inner: false,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(groups) = meta.get("innerInstructions").and_then(Value::as_array) {
            for group in groups {
                if let Some(list) = group.get("instructions").and_then(Value::as_array) {
                    instructions.extend(
                        list.iter()
                            .filter_map(|ix| instruction_program(ix, &account_keys))
                            .map(|program_id| InstructionRef {
                                program_id,
                                inner: true,
                            }),
                    );
                }
            }
        }

        Self {
            signature: signature.to_string(),
            slot: value.get("slot").and_then(Value::as_u64),
            block_time: value.get("blockTime").and_then(Value::as_i64),
            success: error.is_none(),
            error,
            fee: meta.get("fee").and_then(Value::as_u64).unwrap_or(0),
            account_keys,
            pre_balances: u64_list(meta.get("preBalances")),
            post_balances: u64_list(meta.get("postBalances")),
            pre_token_balances: token_balances(meta.get("preTokenBalances")),
            post_token_balances: token_balances(meta.get("postTokenBalances")),
            log_messages: meta
                .get("logMessages")
                .and_then(Value::as_array)
                .map(|lines| lines.iter().filter_map(Value::as_str).map(String::from).collect())
                .unwrap_or_default(),
            instructions,
        }
    }

    pub fn account_index(&self, address: &str) -> Option<usize> {
        self.account_keys.iter().position(|k| k == address)
    }

    /// post - pre lamports for the account at `index`, `None` if it does not fit an i64
    pub fn balance_delta(&self, index: usize) -> Option<i64> {
        let pre = *self.pre_balances.get(index)?;
        let post = *self.post_balances.get(index)?;
        i64::try_from(i128::from(post) - i128::from(pre)).ok()
    }

    pub fn invoked_programs(&self) -> impl Iterator<Item = &str> {
        self.instructions.iter().map(|ix| ix.program_id.as_str())
    }
}

fn account_key_str(key: &Value) -> Option<String> {
    key.as_str()
        .or_else(|| key.get("pubkey").and_then(Value::as_str))
        .map(String::from)
}

fn instruction_program(ix: &Value, account_keys: &[String]) -> Option<String> {
    if let Some(program_id) = ix.get("programId").and_then(Value::as_str) {
        return Some(program_id.to_string());
    }
    let index = ix.get("programIdIndex").and_then(Value::as_u64)? as usize;
    account_keys.get(index).cloned()
}

fn u64_list(value: Option<&Value>) -> Vec<u64> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|v| v.as_u64().unwrap_or(0)).collect())
        .unwrap_or_default()
}

fn token_balances(value: Option<&Value>) -> Vec<TokenBalance> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let ui = item.get("uiTokenAmount")?;
            Some(TokenBalance {
                account_index: item.get("accountIndex")?.as_u64()? as usize,
                mint: item.get("mint")?.as_str()?.to_string(),
                owner: item.get("owner").and_then(Value::as_str).map(String::from),
                amount: ui.get("amount")?.as_str()?.parse().ok()?,
                decimals: ui.get("decimals").and_then(Value::as_u64).unwrap_or(0) as u8,
            })
        })
        .collect()
}

// =============================================================================
// CLASSIFIED TRANSACTION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivativeKind {
    Open,
    Close,
    Increase,
    Decrease,
    Margin,
    Liquidation,
    /// Derivative program invoked without a recognisable action
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionDirection {
    Long,
    Short,
    Neutral,
}

/// Structured result of derivative log parsing; absent fields are neutral/zero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivativeEvent {
    pub kind: DerivativeKind,
    pub venue: Option<String>,
    pub market: Option<String>,
    pub size: f64,
    pub direction: PositionDirection,
    pub pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionType {
    Transfer,
    Swap { side: SwapSide, venue: Option<String> },
    GasFee,
    Derivative(DerivativeEvent),
    Unknown,
}

impl TransactionType {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::Transfer => "transfer",
            TransactionType::Swap { side: SwapSide::Buy, .. } => "swap_buy",
            TransactionType::Swap { side: SwapSide::Sell, .. } => "swap_sell",
            TransactionType::GasFee => "gas_fee",
            TransactionType::Derivative(_) => "derivative",
            TransactionType::Unknown => "unknown",
        }
    }
}

/// Traded token leg of a swap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub mint: String,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    /// Signed UI-unit change for the wallet
    pub token_delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedTransaction {
    pub signature: String,
    pub wallet_address: String,
    pub timestamp: i64,
    pub slot: Option<u64>,
    pub transaction_type: TransactionType,
    /// Signed lamport change of the wallet, fee included
    pub native_amount_delta: i64,
    pub fee_amount: u64,
    pub success: bool,
    pub counterparty_address: Option<String>,
    pub is_internal_transfer: bool,
    pub asset_info: Option<AssetInfo>,
}

impl ClassifiedTransaction {
    pub fn type_label(&self) -> &'static str {
        if self.is_internal_transfer {
            "internal_transfer"
        } else {
            self.transaction_type.label()
        }
    }
}

/// Ascending by timestamp, ties by signature
pub fn sort_chronologically(transactions: &mut [ClassifiedTransaction]) {
    transactions.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.signature.cmp(&b.signature))
    });
}

// =============================================================================
// INGESTION STATE
// =============================================================================

/// Pagination position for one wallet run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletCursor {
    pub wallet_address: String,
    /// Oldest signature seen so far; the next page starts below it
    pub before_signature: Option<String>,
    pub page_size: usize,
    pub exhausted: bool,
}

impl WalletCursor {
    pub fn new(wallet_address: &str, page_size: usize) -> Self {
        Self {
            wallet_address: wallet_address.to_string(),
            before_signature: None,
            page_size,
            exhausted: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub total_estimate: usize,
    /// Non-decreasing until `complete`
    pub processed: usize,
    pub current_batch_index: usize,
    pub complete: bool,
}
