/// Cost-basis ledger
///
/// FIFO lot matching over classified, time-ordered events, with explicit
/// shortfall and holding-period policies. Prices come from a `PriceResolver`;
/// the ledger never fetches them itself.
pub mod lots;
pub mod price;
pub mod report;
pub mod tax;
pub mod types;

pub use lots::{fifo_ledger, native_asset_delta, traded_asset_delta, FifoLedger};
pub use price::{PriceResolver, PriceTable};
pub use tax::TaxSummary;
pub use types::{
    AssetDelta, ConsumedLot, HoldingPeriodPolicy, LedgerOutput, Lot, RealizedEvent, ShortfallPolicy,
};
