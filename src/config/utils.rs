/// Loading, reloading and read access for the process-wide configuration
use super::schemas::Config;
use crate::errors::ConfigurationError;
use crate::logger::{self, LogTag};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::path::Path;

/// Set once by `load_config_from_path`
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

pub const CONFIG_FILE_PATH: &str = "data/config.toml";

/// Read and validate a config file. A missing file yields defaults.
pub fn read_config_file(path: &str) -> Result<Config, ConfigurationError> {
    if !Path::new(path).exists() {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path),
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigurationError::FileRead {
        path: path.to_string(),
        error: e.to_string(),
    })?;

    let config = toml::from_str::<Config>(&contents).map_err(|e| ConfigurationError::Parse {
        path: path.to_string(),
        error: e.to_string(),
    })?;

    config.validate()?;
    Ok(config)
}

/// Initialize the global config. A second call replaces the loaded values.
pub fn load_config_from_path(path: &str) -> Result<(), ConfigurationError> {
    let config = read_config_file(path)?;

    if let Err(lock) = CONFIG.set(RwLock::new(config)) {
        *CONFIG.get_or_init(|| RwLock::new(Config::default())).write() = lock.into_inner();
    }

    logger::debug(LogTag::Config, &format!("Configuration loaded from {}", path));
    Ok(())
}

pub fn load_config() -> Result<(), ConfigurationError> {
    load_config_from_path(CONFIG_FILE_PATH)
}

/// Unlike the initial load, a reload requires the file to exist
pub fn reload_config_from_path(path: &str) -> Result<(), ConfigurationError> {
    if !Path::new(path).exists() {
        return Err(ConfigurationError::FileRead {
            path: path.to_string(),
            error: "file not found".to_string(),
        });
    }
    let new_config = read_config_file(path)?;
    *CONFIG.get_or_init(|| RwLock::new(Config::default())).write() = new_config;
    logger::info(LogTag::Config, &format!("Configuration reloaded from {}", path));
    Ok(())
}

/// Read access; falls back to defaults before the first load
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    let lock = CONFIG.get_or_init(|| RwLock::new(Config::default()));
    let config = lock.read();
    f(&config)
}

/// Owned copy for holding across await points
pub fn get_config_clone() -> Config {
    with_config(|cfg| cfg.clone())
}

pub fn is_config_initialized() -> bool {
    CONFIG.get().is_some()
}

pub fn save_config(path: Option<&str>) -> Result<(), ConfigurationError> {
    let path = path.unwrap_or(CONFIG_FILE_PATH);
    let write_err = |error: String| ConfigurationError::Write {
        path: path.to_string(),
        error,
    };

    let text = with_config(|cfg| toml::to_string_pretty(cfg)).map_err(|e| write_err(e.to_string()))?;
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }
    }
    std::fs::write(path, text).map_err(|e| write_err(e.to_string()))
}
