/// Filtering rules applied before anything is formatted
use super::config::{get_logger_config, is_debug_enabled_for_tag, is_verbose_enabled_for_tag};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Rules, in order:
/// 1. Errors always log
/// 2. Anything above the minimum level is dropped
/// 3. Debug needs `--debug-<tag>`
/// 4. Verbose needs `--verbose` or `--verbose-<tag>`
/// 5. A non-empty enabled set restricts the remaining tags
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    let config = get_logger_config();

    if level == LogLevel::Error {
        return true;
    }

    if level > config.min_level {
        return false;
    }

    match level {
        LogLevel::Debug => is_debug_enabled_for_tag(&config, tag),
        LogLevel::Verbose => {
            config.verbose_tags.is_empty() || is_verbose_enabled_for_tag(&config, tag)
        }
        _ => config.enabled_tags.is_empty() || config.enabled_tags.contains(&tag.to_debug_key()),
    }
}

pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }
    super::format::format_and_log(&tag, level, message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::config::{set_logger_config, LoggerConfig};

    #[test]
    fn test_filtering_rules() {
        let mut config = LoggerConfig::default();
        config.min_level = LogLevel::Debug;
        config.debug_tags.insert("rpc".to_string());
        config.file_logging = false;
        set_logger_config(config);

        assert!(should_log(&LogTag::Ledger, LogLevel::Error));
        assert!(should_log(&LogTag::Ledger, LogLevel::Info));
        assert!(should_log(&LogTag::Rpc, LogLevel::Debug));
        assert!(!should_log(&LogTag::Ledger, LogLevel::Debug));
        assert!(!should_log(&LogTag::Rpc, LogLevel::Verbose));

        set_logger_config(LoggerConfig::default());
    }
}
