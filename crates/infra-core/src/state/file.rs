//! File-backed state store with crash recovery
//!
//! Persists the full store as one JSON document:
//!
//! ```json
//! {
//!   "macbook": {
//!     "brew-formula": { "state": ["bat", "fd", "jq"] },
//!     "hostname": { "state": "adam-macbook" }
//!   }
//! }
//! ```
//!
//! Every successful `set` rewrites the whole file; there is no
//! incremental or append format. Writes go to a temporary file first
//! and are renamed into place, so a crash mid-write leaves the
//! previous state intact. A `.backup` of the last known good state is
//! kept and used when the main file fails to parse on load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::state::StateStore;

/// One plugin's persisted record
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StateEntry {
    /// The last input/diff the plugin applied
    state: Value,
}

type Records = HashMap<String, HashMap<String, StateEntry>>;

/// File-based state store
///
/// Loaded once at open; reads after that never touch the disk. A
/// missing or empty backing file is not an error; it means "no
/// history".
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    records: Arc<RwLock<Records>>,
}

impl FileStateStore {
    /// Open or create a file state store
    ///
    /// Creates parent directories as needed. A corrupted state file is
    /// recovered from the `.backup` copy when possible; when both are
    /// unreadable the store starts empty rather than refusing to run.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::state_store(format!(
                        "Failed to create state directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let records = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            records: Arc::new(RwLock::new(records)),
        })
    }

    async fn load_with_recovery(path: &Path) -> Result<Records, Error> {
        match Self::load(path).await {
            Ok(records) => {
                tracing::debug!(path = %path.display(), "loaded state: {} host(s)", records.len());
                Ok(records)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    path = %path.display(),
                    "state file is corrupted ({e}), attempting recovery from backup"
                );
                let backup = Self::backup_path(path);
                if !backup.exists() {
                    tracing::warn!("no backup found, starting with empty state");
                    return Ok(HashMap::new());
                }
                match Self::load(&backup).await {
                    Ok(records) => {
                        tracing::info!("recovered state from backup: {} host(s)", records.len());
                        if let Err(restore) = fs::copy(&backup, path).await {
                            tracing::warn!("failed to restore state file from backup: {restore}");
                        }
                        Ok(records)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "backup also unreadable ({backup_err}), starting with empty state"
                        );
                        Ok(HashMap::new())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn load(path: &Path) -> Result<Records, Error> {
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::state_store(format!("Failed to read state file {}: {e}", path.display()))
        })?;

        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    /// Write the full store to disk atomically
    async fn write(&self) -> Result<(), Error> {
        let json = {
            let guard = self.records.read().await;
            serde_json::to_string_pretty(&*guard)?
        };

        let temp = self.temp_path();
        {
            let mut file = fs::File::create(&temp).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {e}",
                    temp.display()
                ))
            })?;
            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::state_store(format!("Failed to write {}: {e}", temp.display()))
            })?;
            file.flush().await.map_err(|e| {
                Error::state_store(format!("Failed to flush {}: {e}", temp.display()))
            })?;
        }

        // Keep the previous good state as the backup
        if self.path.exists() {
            if let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await {
                tracing::warn!("failed to update state backup: {e}");
            }
        }

        fs::rename(&temp, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {e}",
                temp.display(),
                self.path.display()
            ))
        })?;

        tracing::trace!(path = %self.path.display(), "state written");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, host: &str, plugin: &str) -> Result<Option<Value>, Error> {
        let guard = self.records.read().await;
        Ok(guard
            .get(host)
            .and_then(|plugins| plugins.get(plugin))
            .map(|entry| entry.state.clone()))
    }

    async fn set(&self, host: &str, plugin: &str, state: Value) -> Result<(), Error> {
        {
            let mut guard = self.records.write().await;
            guard
                .entry(host.to_string())
                .or_default()
                .insert(plugin.to_string(), StateEntry { state });
        }

        // Persist before returning: records already completed must
        // survive an interruption between two plugin runs
        self.write().await
    }

    async fn remove(&self, host: &str, plugin: &str) -> Result<(), Error> {
        {
            let mut guard = self.records.write().await;
            if let Some(plugins) = guard.get_mut(host) {
                plugins.remove(plugin);
                if plugins.is_empty() {
                    guard.remove(host);
                }
            }
        }

        self.write().await
    }

    async fn hosts(&self) -> Result<Vec<String>, Error> {
        let guard = self.records.read().await;
        Ok(guard.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        self.write().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_is_no_history() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::open(dir.path().join("state.json"))
            .await
            .unwrap();
        assert_eq!(store.get("macbook", "hostname").await.unwrap(), None);
        assert!(store.hosts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStateStore::open(&path).await.unwrap();
        store
            .set("macbook", "brew-formula", json!(["bat", "fd"]))
            .await
            .unwrap();
        assert!(path.exists());

        // Fresh process: reload from disk
        let store2 = FileStateStore::open(&path).await.unwrap();
        assert_eq!(
            store2.get("macbook", "brew-formula").await.unwrap(),
            Some(json!(["bat", "fd"]))
        );
    }

    #[tokio::test]
    async fn on_disk_layout_matches_contract() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStateStore::open(&path).await.unwrap();
        store
            .set("macbook", "hostname", json!("adam-macbook"))
            .await
            .unwrap();

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["macbook"]["hostname"]["state"], json!("adam-macbook"));
    }

    #[tokio::test]
    async fn corrupted_file_recovers_from_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStateStore::open(&path).await.unwrap();
        store.set("sid", "packages", json!(["curl"])).await.unwrap();
        // Second write creates the backup of the first state
        store
            .set("sid", "packages", json!(["curl", "git"]))
            .await
            .unwrap();
        assert!(FileStateStore::backup_path(&path).exists());

        std::fs::write(&path, b"{ not json").unwrap();

        let store2 = FileStateStore::open(&path).await.unwrap();
        // The backup holds the previous good state
        assert_eq!(
            store2.get("sid", "packages").await.unwrap(),
            Some(json!(["curl"]))
        );
    }

    #[tokio::test]
    async fn empty_file_is_no_history() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "").unwrap();

        let store = FileStateStore::open(&path).await.unwrap();
        assert!(store.hosts().await.unwrap().is_empty());
    }
}
