//! FIFO lot matching
//!
//! Events must arrive in ascending timestamp order; the ledger refuses to
//! reorder. Internal transfers, gas/fee events and failed transactions are
//! accounting-neutral and skipped. A positive delta opens a lot priced at the
//! event time, a negative delta consumes lots from the front of that asset's
//! queue.

use super::price::PriceResolver;
use super::types::{
    AssetDelta, ConsumedLot, HoldingPeriodPolicy, LedgerOutput, Lot, RealizedEvent, ShortfallPolicy,
};
use crate::arguments::is_debug_ledger_enabled;
use crate::config::LedgerConfig;
use crate::constants::{NATIVE_ASSET, QUANTITY_EPSILON, SECONDS_PER_DAY};
use crate::errors::LedgerInputError;
use crate::logger::{self, LogTag};
use crate::transactions::types::{ClassifiedTransaction, TransactionType};
use crate::utils::{format_signature_short, lamports_to_sol};
use std::collections::{BTreeMap, VecDeque};

/// Native balance change in whole units, fee included
pub fn native_asset_delta(event: &ClassifiedTransaction) -> Option<AssetDelta> {
    Some(AssetDelta {
        asset: NATIVE_ASSET.to_string(),
        quantity: lamports_to_sol(event.native_amount_delta),
    })
}

/// Token leg for swaps that resolved one, native delta otherwise
pub fn traded_asset_delta(event: &ClassifiedTransaction) -> Option<AssetDelta> {
    match (&event.transaction_type, &event.asset_info) {
        (TransactionType::Swap { .. }, Some(info)) => Some(AssetDelta {
            asset: info.symbol.clone().unwrap_or_else(|| info.mint.clone()),
            quantity: info.token_delta,
        }),
        _ => native_asset_delta(event),
    }
}

fn is_taxable(event: &ClassifiedTransaction) -> bool {
    event.success
        && !event.is_internal_transfer
        && !matches!(event.transaction_type, TransactionType::GasFee)
}

pub struct FifoLedger {
    shortfall_policy: ShortfallPolicy,
    holding_period_policy: HoldingPeriodPolicy,
    long_term_threshold_secs: i64,
    open: BTreeMap<String, VecDeque<Lot>>,
    realized: Vec<RealizedEvent>,
    total_gain: f64,
    total_loss: f64,
    last_timestamp: Option<i64>,
}

impl FifoLedger {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            shortfall_policy: config.shortfall_policy,
            holding_period_policy: config.holding_period_policy,
            long_term_threshold_secs: config.long_term_threshold_days * SECONDS_PER_DAY,
            open: BTreeMap::new(),
            realized: Vec::new(),
            total_gain: 0.0,
            total_loss: 0.0,
            last_timestamp: None,
        }
    }

    /// Feed one event. Returns the realized events it produced (empty for
    /// acquisitions and skipped events). On error the ledger is unchanged.
    pub fn apply<A, P>(
        &mut self,
        event: &ClassifiedTransaction,
        asset_of: A,
        prices: &P,
    ) -> Result<Vec<RealizedEvent>, LedgerInputError>
    where
        A: Fn(&ClassifiedTransaction) -> Option<AssetDelta>,
        P: PriceResolver + ?Sized,
    {
        if let Some(previous) = self.last_timestamp {
            if event.timestamp < previous {
                return Err(LedgerInputError::NonMonotonicTimestamp {
                    signature: event.signature.clone(),
                    timestamp: event.timestamp,
                    previous,
                });
            }
        }

        if !is_taxable(event) {
            self.last_timestamp = Some(event.timestamp);
            return Ok(Vec::new());
        }

        let delta = match asset_of(event) {
            Some(delta) => delta,
            None => {
                self.last_timestamp = Some(event.timestamp);
                return Ok(Vec::new());
            }
        };
        if !delta.quantity.is_finite() {
            return Err(LedgerInputError::InvalidQuantity {
                signature: event.signature.clone(),
                quantity: delta.quantity,
            });
        }
        if delta.quantity.abs() <= QUANTITY_EPSILON {
            self.last_timestamp = Some(event.timestamp);
            return Ok(Vec::new());
        }

        let price = resolve_price(prices, event.timestamp, &delta.asset)?;

        let produced = if delta.quantity > 0.0 {
            self.acquire(event, delta, price);
            Vec::new()
        } else {
            self.dispose(event, delta, price)?
        };

        self.last_timestamp = Some(event.timestamp);
        Ok(produced)
    }

    fn acquire(&mut self, event: &ClassifiedTransaction, delta: AssetDelta, unit_cost_usd: f64) {
        if is_debug_ledger_enabled() {
            logger::debug(
                LogTag::Ledger,
                &format!(
                    "lot opened: {} {} @ ${:.4} ({})",
                    delta.quantity,
                    delta.asset,
                    unit_cost_usd,
                    format_signature_short(&event.signature)
                ),
            );
        }
        self.open.entry(delta.asset.clone()).or_default().push_back(Lot {
            asset: delta.asset,
            quantity: delta.quantity,
            unit_cost_usd,
            acquired_at: event.timestamp,
            source_signature: event.signature.clone(),
        });
    }

    fn dispose(
        &mut self,
        event: &ClassifiedTransaction,
        delta: AssetDelta,
        price: f64,
    ) -> Result<Vec<RealizedEvent>, LedgerInputError> {
        let requested = delta.quantity.abs();
        let available: f64 = self
            .open
            .get(&delta.asset)
            .map(|queue| queue.iter().map(|lot| lot.quantity).sum())
            .unwrap_or(0.0);

        if requested > available + QUANTITY_EPSILON && self.shortfall_policy == ShortfallPolicy::Reject {
            return Err(LedgerInputError::ShortfallRejected {
                asset: delta.asset,
                signature: event.signature.clone(),
                requested,
                available,
            });
        }

        let queue = self.open.entry(delta.asset.clone()).or_default();
        let mut remaining = requested;
        let mut consumed: Vec<ConsumedLot> = Vec::new();
        while remaining > QUANTITY_EPSILON {
            let Some(lot) = queue.front_mut() else {
                break;
            };
            let take = remaining.min(lot.quantity);
            consumed.push(ConsumedLot {
                source_signature: lot.source_signature.clone(),
                acquired_at: lot.acquired_at,
                quantity: take,
                unit_cost_usd: lot.unit_cost_usd,
            });
            lot.quantity -= take;
            remaining -= take;
            if lot.quantity <= QUANTITY_EPSILON {
                queue.pop_front();
            }
        }
        if queue.is_empty() {
            self.open.remove(&delta.asset);
        }

        let shortfall = if remaining > QUANTITY_EPSILON { remaining } else { 0.0 };
        if shortfall > 0.0 {
            logger::warning(
                LogTag::Ledger,
                &format!(
                    "{}: disposal of {} {} exceeds open lots by {}, shortfall booked at disposal price",
                    format_signature_short(&event.signature),
                    requested,
                    delta.asset,
                    shortfall
                ),
            );
        }

        let events = match self.holding_period_policy {
            HoldingPeriodPolicy::EarliestLot => {
                vec![self.realize(event, &delta.asset, price, consumed, shortfall)]
            }
            HoldingPeriodPolicy::SplitPerLot => {
                let mut events: Vec<RealizedEvent> = consumed
                    .into_iter()
                    .map(|lot| self.realize(event, &delta.asset, price, vec![lot], 0.0))
                    .collect();
                if shortfall > 0.0 {
                    events.push(self.realize(event, &delta.asset, price, Vec::new(), shortfall));
                }
                events
            }
        };

        for realized in &events {
            if realized.gain_loss_usd >= 0.0 {
                self.total_gain += realized.gain_loss_usd;
            } else {
                self.total_loss += -realized.gain_loss_usd;
            }
        }
        self.realized.extend(events.iter().cloned());
        Ok(events)
    }

    fn realize(
        &self,
        event: &ClassifiedTransaction,
        asset: &str,
        price: f64,
        consumed: Vec<ConsumedLot>,
        shortfall: f64,
    ) -> RealizedEvent {
        let lot_quantity: f64 = consumed.iter().map(|lot| lot.quantity).sum();
        let disposed_quantity = lot_quantity + shortfall;
        let cost_basis_usd = consumed
            .iter()
            .map(|lot| lot.quantity * lot.unit_cost_usd)
            .sum::<f64>()
            + shortfall * price;
        let proceeds_usd = disposed_quantity * price;
        let holding_period_seconds = consumed
            .iter()
            .map(|lot| lot.acquired_at)
            .min()
            .map(|earliest| event.timestamp - earliest)
            .unwrap_or(0);

        RealizedEvent {
            asset: asset.to_string(),
            signature: event.signature.clone(),
            disposed_at: event.timestamp,
            disposed_quantity,
            proceeds_usd,
            cost_basis_usd,
            gain_loss_usd: proceeds_usd - cost_basis_usd,
            holding_period_seconds,
            is_long_term: holding_period_seconds >= self.long_term_threshold_secs,
            consumed_lots: consumed,
            shortfall_quantity: shortfall,
        }
    }

    pub fn realized_events(&self) -> &[RealizedEvent] {
        &self.realized
    }

    pub fn open_lots(&self) -> Vec<Lot> {
        self.open.values().flatten().cloned().collect()
    }

    pub fn output(&self) -> LedgerOutput {
        LedgerOutput {
            realized_events: self.realized.clone(),
            open_lots: self.open_lots(),
            total_gain: self.total_gain,
            total_loss: self.total_loss,
        }
    }
}

fn resolve_price<P: PriceResolver + ?Sized>(
    prices: &P,
    timestamp: i64,
    asset: &str,
) -> Result<f64, LedgerInputError> {
    match prices.price(timestamp, asset) {
        Some(price) if price.is_finite() && price >= 0.0 => Ok(price),
        Some(price) => Err(LedgerInputError::InvalidPrice {
            asset: asset.to_string(),
            timestamp,
            price,
        }),
        None => Err(LedgerInputError::PriceUnavailable {
            asset: asset.to_string(),
            timestamp,
        }),
    }
}

/// Run a whole ascending event stream through a fresh ledger
pub fn fifo_ledger<A, P>(
    events: &[ClassifiedTransaction],
    asset_of: A,
    prices: &P,
    config: &LedgerConfig,
) -> Result<LedgerOutput, LedgerInputError>
where
    A: Fn(&ClassifiedTransaction) -> Option<AssetDelta>,
    P: PriceResolver + ?Sized,
{
    let mut ledger = FifoLedger::new(config);
    for event in events {
        ledger.apply(event, &asset_of, prices)?;
    }
    let output = ledger.output();
    logger::info(
        LogTag::Ledger,
        &format!(
            "{} events -> {} realized, {} open lots, net ${:.2}",
            events.len(),
            output.realized_events.len(),
            output.open_lots.len(),
            output.net_gain_loss()
        ),
    );
    Ok(output)
}
