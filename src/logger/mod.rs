//! Structured logging for walletledger
//!
//! - Standard levels (Error/Warning/Info/Debug/Verbose)
//! - Per-module debug control via `--debug-<module>` flags
//! - Dual output: colored console + log file
//!
//! ## Usage
//!
//! ```rust
//! use walletledger::logger::{self, LogTag};
//!
//! logger::error(LogTag::Rpc, "Connection failed");
//! logger::warning(LogTag::Backoff, "Rate limited, retrying in 2s");
//! logger::info(LogTag::Ingest, "Wallet ingestion complete");
//! logger::debug(LogTag::Classify, "Balance delta: ..."); // Only with --debug-classify
//! logger::verbose(LogTag::Rpc, "Raw response: ...");     // Only with --verbose
//! ```
//!
//! Call `logger::init()` once at startup, before services are created.

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{get_logger_config, set_logger_config, LoggerConfig};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger from command-line flags and open the log file
pub fn init() {
    config::init_from_args();
    file::init_file_logging();
}

/// Always shown
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Shown unless `--quiet` raised the threshold above warnings
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Only shown when `--debug-<tag>` was passed
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Only shown with `--verbose` or `--verbose-<tag>`
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Flush pending file writes; call during shutdown
pub fn flush() {
    file::flush_file_logging();
}
