use serde::{Deserialize, Serialize};

// =============================================================================
// POLICIES
// =============================================================================

/// What to do when a disposal exceeds the tracked open lots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallPolicy {
    /// Treat the untracked part as acquired at the disposal price
    #[default]
    ZeroGain,
    /// Fail with `LedgerInputError::ShortfallRejected`
    Reject,
}

/// How a disposal that consumes several lots is dated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldingPeriodPolicy {
    /// One event per disposal, aged from the earliest consumed lot
    #[default]
    EarliestLot,
    /// One event per consumed lot, each with its own age
    SplitPerLot,
}

// =============================================================================
// LEDGER INPUT / OUTPUT
// =============================================================================

/// Signed quantity of one asset moved by an event
#[derive(Debug, Clone, PartialEq)]
pub struct AssetDelta {
    pub asset: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub asset: String,
    pub quantity: f64,
    pub unit_cost_usd: f64,
    pub acquired_at: i64,
    pub source_signature: String,
}

/// Part of a lot used up by one disposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumedLot {
    pub source_signature: String,
    pub acquired_at: i64,
    pub quantity: f64,
    pub unit_cost_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedEvent {
    pub asset: String,
    pub signature: String,
    pub disposed_at: i64,
    pub disposed_quantity: f64,
    pub proceeds_usd: f64,
    pub cost_basis_usd: f64,
    pub gain_loss_usd: f64,
    pub holding_period_seconds: i64,
    pub is_long_term: bool,
    pub consumed_lots: Vec<ConsumedLot>,
    /// Quantity not covered by open lots, priced at disposal (zero gain)
    pub shortfall_quantity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerOutput {
    pub realized_events: Vec<RealizedEvent>,
    /// Grouped by asset name, FIFO order within an asset
    pub open_lots: Vec<Lot>,
    pub total_gain: f64,
    /// Positive magnitude of all losses
    pub total_loss: f64,
}

impl LedgerOutput {
    pub fn net_gain_loss(&self) -> f64 {
        self.total_gain - self.total_loss
    }
}
