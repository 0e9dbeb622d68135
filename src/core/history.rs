/*
 * Persists the bounded list of past search queries across process lifetimes.
 * The list is ordered most-recent-first and capped at a configurable limit;
 * storage is a small JSON file in the application's local config directory.
 *
 * A trait (`HistoryStoreOperations`) fronts the store so hosts can inject a
 * mock, and so the storage location can differ in tests. The engine itself
 * never touches history; recording a query is the host's decision, made when
 * a search actually starts.
 */
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::path_utils;

const HISTORY_FILENAME: &str = "search_history.json";
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Debug)]
pub enum HistoryError {
    Io(io::Error),
    Serde(serde_json::Error),
    NoConfigDirectory,
}

impl From<io::Error> for HistoryError {
    fn from(err: io::Error) -> Self {
        HistoryError::Io(err)
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(err: serde_json::Error) -> Self {
        HistoryError::Serde(err)
    }
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryError::Io(e) => write!(f, "History I/O error: {e}"),
            HistoryError::Serde(e) => write!(f, "History serialization error: {e}"),
            HistoryError::NoConfigDirectory => {
                write!(f, "Could not determine config directory for search history")
            }
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HistoryError::Io(e) => Some(e),
            HistoryError::Serde(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HistoryError>;

// On-disk shape. A wrapper struct rather than a bare list so the format can
// grow fields without breaking old files.
#[derive(Debug, Serialize, Deserialize)]
struct HistoryFile {
    entries: Vec<String>,
}

pub trait HistoryStoreOperations: Send + Sync {
    /*
     * Loads the persisted history, most recent first. A store that has never
     * been written reads as empty, not as an error.
     */
    fn load(&self) -> Result<Vec<String>>;

    /*
     * Persists the given entries, truncated to the configured limit. The
     * caller supplies entries most-recent-first and the order is preserved.
     */
    fn save(&self, entries: &[String]) -> Result<()>;

    /*
     * Adjusts the cap. Takes effect for subsequent saves; the persisted file
     * is re-truncated immediately on a best-effort basis when it already
     * exceeds the new limit.
     */
    fn set_limit(&self, limit: usize);
}

pub struct CoreHistoryStore {
    app_name: String,
    // Tests point the store at a throwaway directory instead of the real
    // per-user config location.
    storage_dir_override: Option<PathBuf>,
    limit: AtomicUsize,
}

impl CoreHistoryStore {
    pub fn new(app_name: &str) -> Self {
        CoreHistoryStore {
            app_name: app_name.to_string(),
            storage_dir_override: None,
            limit: AtomicUsize::new(DEFAULT_HISTORY_LIMIT),
        }
    }

    pub fn with_storage_dir(storage_dir: PathBuf) -> Self {
        CoreHistoryStore {
            app_name: String::new(),
            storage_dir_override: Some(storage_dir),
            limit: AtomicUsize::new(DEFAULT_HISTORY_LIMIT),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit.load(Ordering::Relaxed)
    }

    /*
     * Records one query: removes any earlier occurrence, prepends it, trims
     * to the limit, and persists. Returns the updated history so a host can
     * refresh its menu in one step.
     */
    pub fn remember(&self, query: &str) -> Result<Vec<String>> {
        let mut entries = self.load()?;
        entries.retain(|existing| existing != query);
        entries.insert(0, query.to_string());
        entries.truncate(self.limit());
        self.save(&entries)?;
        Ok(entries)
    }

    fn history_file_path(&self) -> Result<PathBuf> {
        let dir = match &self.storage_dir_override {
            Some(dir) => dir.clone(),
            None => path_utils::get_base_app_config_local_dir(&self.app_name)
                .ok_or(HistoryError::NoConfigDirectory)?,
        };
        Ok(dir.join(HISTORY_FILENAME))
    }
}

impl HistoryStoreOperations for CoreHistoryStore {
    fn load(&self) -> Result<Vec<String>> {
        let file_path = self.history_file_path()?;
        if !file_path.exists() {
            log::debug!("CoreHistoryStore: History file {file_path:?} does not exist yet.");
            return Ok(Vec::new());
        }

        let file = File::open(&file_path)?;
        let reader = BufReader::new(file);
        let history: HistoryFile = serde_json::from_reader(reader)?;
        log::trace!(
            "CoreHistoryStore: Loaded {} history entries from {file_path:?}.",
            history.entries.len()
        );
        Ok(history.entries)
    }

    fn save(&self, entries: &[String]) -> Result<()> {
        let file_path = self.history_file_path()?;
        let limit = self.limit();
        let bounded: Vec<String> = entries.iter().take(limit).cloned().collect();

        let file = File::create(&file_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &HistoryFile { entries: bounded })?;
        log::debug!(
            "CoreHistoryStore: Saved {} history entries to {file_path:?}.",
            entries.len().min(limit)
        );
        Ok(())
    }

    fn set_limit(&self, limit: usize) {
        self.limit.store(limit, Ordering::Relaxed);
        // Best-effort re-truncation of what is already on disk.
        match self.load() {
            Ok(entries) if entries.len() > limit => {
                if let Err(e) = self.save(&entries) {
                    log::warn!("CoreHistoryStore: Failed to re-truncate history: {e}");
                }
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("CoreHistoryStore: Could not load history while setting limit: {e}");
            }
        }
    }
}
