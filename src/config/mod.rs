//! Logger configuration
//!
//! Settings live in a key/value store under the `LOGGER` section. Missing or
//! unusable values are never errors: they are replaced by their default and
//! written back.

mod store;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use toml::Value;

use crate::error::{ConfigResult, LoggerError};
use crate::logging::LevelThreshold;

pub use store::{BoxedConfigStore, ConfigStore, MemoryConfigStore, TomlConfigStore};

pub const KEY_LOG_LEVEL: &str = "LOGGER/log_level";
pub const KEY_LIFETIME: &str = "LOGGER/lifetime";
pub const KEY_DIR: &str = "LOGGER/dir";
pub const KEY_NAME_PATTERN: &str = "LOGGER/name_pattern";

pub const DEFAULT_LOG_LEVEL: i64 = 1;
pub const DEFAULT_LIFETIME_DAYS: i64 = 30;
pub const DEFAULT_NAME_PATTERN: &str = "log_%1.log";

/// Placeholder in the filename pattern replaced by the current date
pub const DATE_PLACEHOLDER: &str = "%1";

/// `dd.MM.yyyy`
pub const DATE_FORMAT: &str = "%d.%m.%Y";

const CONFIG_FILE_NAME: &str = "log.toml";
const LOGS_DIR_NAME: &str = "Logs";

/// Directory the executable lives in, with fallbacks
///
/// Falls back to the platform data directory, then the current directory.
fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| dirs::data_local_dir().map(|d| d.join("daylog")))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Base directory for the default config file and log directory
///
/// Next to the executable on Windows, its parent elsewhere.
fn base_dir() -> PathBuf {
    let exe_dir = executable_dir();
    if cfg!(windows) {
        exe_dir
    } else {
        exe_dir.join("..")
    }
}

/// Default location of the config file
pub fn default_config_path() -> PathBuf {
    base_dir().join(CONFIG_FILE_NAME)
}

/// Default log directory
pub fn default_log_dir() -> PathBuf {
    base_dir().join(LOGS_DIR_NAME)
}

/// The values read from a config store in one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub log_level: i64,
    pub lifetime_days: i64,
    pub dir: PathBuf,
    pub name_pattern: String,
}

impl Settings {
    /// The documented defaults, used when the store cannot be read at all
    pub fn defaults(default_dir: &Path) -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL,
            lifetime_days: DEFAULT_LIFETIME_DAYS,
            dir: default_dir.to_path_buf(),
            name_pattern: DEFAULT_NAME_PATTERN.to_string(),
        }
    }

    /// Read every recognised key, repairing missing or invalid ones
    pub fn read(store: &mut dyn ConfigStore, default_dir: &Path) -> ConfigResult<Self> {
        Ok(Self {
            log_level: read_int(store, KEY_LOG_LEVEL, DEFAULT_LOG_LEVEL)?,
            lifetime_days: read_int(store, KEY_LIFETIME, DEFAULT_LIFETIME_DAYS)?,
            dir: PathBuf::from(read_string(
                store,
                KEY_DIR,
                &default_dir.to_string_lossy(),
                |s| !s.trim().is_empty(),
            )?),
            name_pattern: read_string(store, KEY_NAME_PATTERN, DEFAULT_NAME_PATTERN, |s| {
                s.contains(DATE_PLACEHOLDER)
            })?,
        })
    }
}

fn read_int(store: &mut dyn ConfigStore, key: &str, default: i64) -> ConfigResult<i64> {
    let value = store.get(key, Value::Integer(default))?;
    let parsed = match &value {
        Value::Integer(i) => Some(*i),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };

    match parsed {
        Some(i) => Ok(i),
        None => {
            store.set(key, Value::Integer(default))?;
            Ok(default)
        }
    }
}

fn read_string(
    store: &mut dyn ConfigStore,
    key: &str,
    default: &str,
    valid: impl Fn(&str) -> bool,
) -> ConfigResult<String> {
    let value = store.get(key, Value::String(default.to_string()))?;
    match value.as_str() {
        Some(s) if valid(s) => Ok(s.to_string()),
        _ => {
            store.set(key, Value::String(default.to_string()))?;
            Ok(default.to_string())
        }
    }
}

/// Live configuration of the writer
///
/// Owned by the worker thread; every mutator keeps the invariants
/// (retention >= 1 day, threshold in 0..=2, directory exists).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    directory: PathBuf,
    name_pattern: String,
    retention_days: u32,
    threshold: LevelThreshold,
}

impl LoggerConfig {
    /// Build a config, creating `directory`
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, LoggerError> {
        let mut config = Self {
            directory: PathBuf::new(),
            name_pattern: DEFAULT_NAME_PATTERN.to_string(),
            retention_days: DEFAULT_LIFETIME_DAYS as u32,
            threshold: LevelThreshold::from_raw(DEFAULT_LOG_LEVEL),
        };
        config.set_directory(directory)?;
        Ok(config)
    }

    /// Build a config from store settings, creating the directory
    pub fn from_settings(settings: &Settings) -> Result<Self, LoggerError> {
        let mut config = Self::new(&settings.dir)?;
        config.apply(settings)?;
        Ok(config)
    }

    /// Apply freshly read settings
    pub fn apply(&mut self, settings: &Settings) -> Result<(), LoggerError> {
        self.set_level(settings.log_level);
        self.set_directory(&settings.dir)?;
        self.set_retention_days(settings.lifetime_days);
        self.set_filename_pattern(&settings.name_pattern);
        Ok(())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn name_pattern(&self) -> &str {
        &self.name_pattern
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    pub fn threshold(&self) -> LevelThreshold {
        self.threshold
    }

    /// Set the level threshold; values outside `0..=2` clamp to the nearest bound
    pub fn set_level(&mut self, raw: i64) {
        self.threshold = LevelThreshold::from_raw(raw);
    }

    /// Set the retention window; values below 1 become 1
    pub fn set_retention_days(&mut self, days: i64) {
        self.retention_days = days.clamp(1, u32::MAX as i64) as u32;
    }

    pub fn set_filename_pattern(&mut self, pattern: impl Into<String>) {
        self.name_pattern = pattern.into();
    }

    /// Point at a new log directory, creating it
    ///
    /// On failure the previous directory stays in effect.
    pub fn set_directory(&mut self, directory: impl Into<PathBuf>) -> Result<(), LoggerError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory).map_err(|source| LoggerError::CreateDirectory {
            path: directory.clone(),
            source,
        })?;
        self.directory = directory;
        Ok(())
    }

    /// File name for `date`, e.g. `log_21.01.2026.log`
    pub fn file_name(&self, date: NaiveDate) -> String {
        let stamp = date.format(DATE_FORMAT).to_string();
        self.name_pattern.replace(DATE_PLACEHOLDER, &stamp)
    }

    /// Full path of the log file for `date`
    pub fn file_path(&self, date: NaiveDate) -> PathBuf {
        self.directory.join(self.file_name(date))
    }
}
