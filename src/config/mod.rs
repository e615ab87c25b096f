/// Configuration system
///
/// - `macros`: `config_struct!` for structs with embedded defaults
/// - `schemas`: every section walletledger reads
/// - `utils`: loading, reloading and access helpers
///
/// Components receive their section by value; only `main.rs` touches the global.
pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::*;
pub use utils::*;
