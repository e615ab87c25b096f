pub mod arguments;
pub mod cache;
pub mod config;
pub mod constants;
pub mod errors;
pub mod ledger;
pub mod logger;
pub mod persistence;
pub mod queue;
pub mod rpc;
pub mod transactions;
pub mod utils;
