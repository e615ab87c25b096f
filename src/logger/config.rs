/// Logger configuration built from command-line flags
use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments::{get_prefixed_flags, is_quiet_enabled, is_verbose_enabled};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Lines above this level are dropped
    pub min_level: LogLevel,
    /// Tags with `--debug-<tag>`
    pub debug_tags: HashSet<String>,
    /// Tags with `--verbose-<tag>`
    pub verbose_tags: HashSet<String>,
    /// When non-empty only these tags log at info level
    pub enabled_tags: HashSet<String>,
    /// Mirror console lines into the log file
    pub file_logging: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
            enabled_tags: HashSet::new(),
            file_logging: true,
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

/// Scan command-line flags: `--debug-<tag>`, `--verbose[-<tag>]`, `--quiet`,
/// `--no-log-file`
pub fn init_from_args() {
    let mut config = LoggerConfig::default();

    config.debug_tags = get_prefixed_flags("--debug-").into_iter().collect();
    config.verbose_tags = get_prefixed_flags("--verbose-").into_iter().collect();

    if !config.debug_tags.is_empty() {
        config.min_level = LogLevel::Debug;
    }
    if is_verbose_enabled() || !config.verbose_tags.is_empty() {
        config.min_level = LogLevel::Verbose;
    }
    if is_quiet_enabled() {
        config.min_level = LogLevel::Warning;
    }
    config.file_logging = !crate::arguments::has_arg("--no-log-file");

    set_logger_config(config);
}

pub fn is_debug_enabled_for_tag(config: &LoggerConfig, tag: &LogTag) -> bool {
    config.debug_tags.contains(&tag.to_debug_key())
}

pub fn is_verbose_enabled_for_tag(config: &LoggerConfig, tag: &LogTag) -> bool {
    config.verbose_tags.contains(&tag.to_debug_key())
}
