//! Key/value configuration stores
//!
//! Keys are `SECTION/name`, e.g. `LOGGER/log_level`; a key without a slash
//! lives at the top level. Reading a missing key stores and persists the
//! supplied default.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use toml::{Table, Value};

use crate::error::{ConfigError, ConfigResult};

/// Configuration store abstraction
///
/// Implementations:
/// - `TomlConfigStore`: a TOML file, re-read on every `reload`
/// - `MemoryConfigStore`: in-memory for testing
pub trait ConfigStore: Send {
    /// Get the value under `key`, inserting and persisting `default` if it is missing
    fn get(&mut self, key: &str, default: Value) -> ConfigResult<Value>;

    /// Set `key` to `value` and persist it
    fn set(&mut self, key: &str, value: Value) -> ConfigResult<()>;

    /// Re-read the backing storage, picking up external edits
    fn reload(&mut self) -> ConfigResult<()> {
        Ok(())
    }

    /// Backing file, if the store has one
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// Type alias for a boxed config store
pub type BoxedConfigStore = Box<dyn ConfigStore>;

fn split_key(key: &str) -> (Option<&str>, &str) {
    match key.split_once('/') {
        Some((section, name)) => (Some(section), name),
        None => (None, key),
    }
}

fn lookup<'a>(table: &'a Table, key: &str) -> Option<&'a Value> {
    match split_key(key) {
        (Some(section), name) => table.get(section)?.as_table()?.get(name),
        (None, name) => table.get(name),
    }
}

fn insert(table: &mut Table, key: &str, value: Value) {
    match split_key(key) {
        (Some(section), name) => {
            let entry = table
                .entry(section.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            if let Value::Table(section) = entry {
                section.insert(name.to_string(), value);
            }
        }
        (None, name) => {
            table.insert(name.to_string(), value);
        }
    }
}

/// File-backed store in TOML format
///
/// ```toml
/// [LOGGER]
/// log_level = 1
/// lifetime = 30
/// dir = "/opt/app/Logs/"
/// name_pattern = "log_%1.log"
/// ```
#[derive(Debug)]
pub struct TomlConfigStore {
    path: PathBuf,
    table: Table,
}

impl TomlConfigStore {
    /// A store for `path` that has not read the file yet
    ///
    /// A relative `path` is resolved against the current directory.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            path: std::path::absolute(&path).unwrap_or(path),
            table: Table::new(),
        }
    }

    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let mut store = Self::new(path);
        store.reload()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> ConfigResult<()> {
        let content = toml::to_string_pretty(&self.table)?;
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&self.path, content).map_err(io_err)
    }
}

impl ConfigStore for TomlConfigStore {
    fn get(&mut self, key: &str, default: Value) -> ConfigResult<Value> {
        if let Some(value) = lookup(&self.table, key) {
            return Ok(value.clone());
        }

        insert(&mut self.table, key, default.clone());
        self.save()?;
        Ok(default)
    }

    fn set(&mut self, key: &str, value: Value) -> ConfigResult<()> {
        insert(&mut self.table, key, value);
        self.save()
    }

    fn reload(&mut self) -> ConfigResult<()> {
        if !self.path.exists() {
            self.table = Table::new();
            return Ok(());
        }

        let content = fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;

        self.table = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// In-memory store for testing
///
/// Clones share the same table, so a test can keep one clone and edit values
/// while the logger holds another.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    table: Arc<Mutex<Table>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with initial `(key, value)` pairs
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut table = Table::new();
        for (key, value) in values {
            insert(&mut table, key.as_ref(), value.into());
        }
        Self {
            table: Arc::new(Mutex::new(table)),
        }
    }

    /// Read a value without inserting a default
    pub fn peek(&self, key: &str) -> Option<Value> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        lookup(&table, key).cloned()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&mut self, key: &str, default: Value) -> ConfigResult<Value> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = lookup(&table, key) {
            return Ok(value.clone());
        }
        insert(&mut table, key, default.clone());
        Ok(default)
    }

    fn set(&mut self, key: &str, value: Value) -> ConfigResult<()> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        insert(&mut table, key, value);
        Ok(())
    }
}
