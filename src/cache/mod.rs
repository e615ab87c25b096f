/// Wallet-scoped TTL cache
///
/// Keys are `{prefix}{wallet}` (balance) and `{prefix}transactions_{wallet}`
/// (processed history). Values are stored as `{data, timestamp}`; entries
/// older than the TTL read as absent and are evicted on that read.
pub mod clock;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{CacheMetrics, CacheStore};
