use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::StorageConfig;
use crate::models::{LogEntry, LogKind, SiteConfig};
use crate::utils::error::{AppError, Result};

/// Most recent entries kept in the log file.
pub const LOG_CAPACITY: usize = 100;

/// JSON files holding the current selector configuration and the event log.
/// Assumes a single owning process. Clones share one log lock, so appends
/// from concurrent cycles and the stop handler never interleave.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
    log_path: PathBuf,
    log_lock: Arc<Mutex<()>>,
}

impl ConfigStore {
    pub fn new(config_path: impl Into<PathBuf>, log_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            log_path: log_path.into(),
            log_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn from_config(storage: &StorageConfig) -> Self {
        Self::new(&storage.config_path, &storage.log_path)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// The stored configuration, or `None` when there is no usable baseline.
    pub fn load(&self) -> Option<SiteConfig> {
        match self.try_load() {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::info!("{}; starting without a baseline", e);
                None
            }
        }
    }

    pub fn try_load(&self) -> Result<SiteConfig> {
        let text = fs::read_to_string(&self.config_path).map_err(|e| {
            AppError::ConfigLoad(format!("cannot read {}: {}", self.config_path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            AppError::ConfigLoad(format!("malformed {}: {}", self.config_path.display(), e))
        })
    }

    /// Replaces the whole stored configuration.
    pub fn persist(&self, config: &SiteConfig) -> Result<()> {
        write_json_atomic(&self.config_path, config)?;
        tracing::info!("Saved selector configuration to {}", self.config_path.display());
        Ok(())
    }

    /// Stored log entries, oldest first. Unreadable logs read as empty.
    pub fn read_log(&self) -> Vec<LogEntry> {
        let Ok(text) = fs::read_to_string(&self.log_path) else {
            return Vec::new();
        };
        match serde_json::from_str(&text) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::info!("Ignoring malformed log {}: {}", self.log_path.display(), e);
                Vec::new()
            }
        }
    }

    /// Appends one entry and rewrites the log, keeping the newest `LOG_CAPACITY`.
    pub fn append_log(&self, entry: LogEntry) -> Result<()> {
        echo(&entry);

        let _guard = self.log_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_log();
        entries.push(entry);
        if entries.len() > LOG_CAPACITY {
            let excess = entries.len() - LOG_CAPACITY;
            entries.drain(..excess);
        }

        write_json_atomic(&self.log_path, &entries)
    }

    /// Like [`append_log`](Self::append_log), but a write failure is only
    /// reported through tracing. Cycle code uses this so bookkeeping can
    /// never abort a cycle.
    pub fn record(&self, entry: LogEntry) {
        if let Err(e) = self.append_log(entry) {
            tracing::error!("Failed to write {}: {}", self.log_path.display(), e);
        }
    }
}

fn echo(entry: &LogEntry) {
    match entry.kind {
        LogKind::Error => tracing::error!(kind = %entry.kind, "{}", entry.message),
        LogKind::Warning => tracing::warn!(kind = %entry.kind, "{}", entry.message),
        _ => tracing::info!(kind = %entry.kind, "{}", entry.message),
    }
}

/// Writes to a sibling temp file, then renames over the target so readers
/// never see a partial file.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let contents = serde_json::to_string_pretty(value)?;
    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
