use crate::config::OutputConfig;
use crate::output::{History, Snapshot};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// File-backed storage for the snapshot and history documents
#[derive(Debug, Clone)]
pub struct JsonStorage {
    snapshot_path: PathBuf,
    history_path: PathBuf,
}

impl JsonStorage {
    pub fn new(snapshot_path: impl Into<PathBuf>, history_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            history_path: history_path.into(),
        }
    }

    pub fn from_config(output: &OutputConfig) -> Self {
        Self::new(&output.snapshot_path, &output.history_path)
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }
}

impl Storage for JsonStorage {
    fn load_snapshot(&self) -> StorageResult<Option<Snapshot>> {
        read_document(&self.snapshot_path)
    }

    fn save_snapshot(&self, snapshot: &Snapshot) -> StorageResult<()> {
        write_atomic(&self.snapshot_path, snapshot)
    }

    fn load_history(&self) -> StorageResult<History> {
        Ok(read_document(&self.history_path)?.unwrap_or_default())
    }

    fn save_history(&self, history: &History) -> StorageResult<()> {
        write_atomic(&self.history_path, history)
    }

    fn set_aside_history(&self) -> StorageResult<Option<PathBuf>> {
        if !self.history_path.exists() {
            return Ok(None);
        }
        let target = sibling_path(&self.history_path, "corrupt");
        fs::rename(&self.history_path, &target).map_err(|source| StorageError::Io {
            path: self.history_path.clone(),
            source,
        })?;
        Ok(Some(target))
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| StorageError::Malformed {
            path: path.to_path_buf(),
            source,
        })
}

/// Serializes `value` and swaps it into place via a sibling temp file
fn write_atomic<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    // Serialize before touching the filesystem so a bad value never truncates anything.
    let mut payload = serde_json::to_vec_pretty(value)?;
    payload.push(b'\n');

    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp_path = sibling_path(path, "tmp");
    let result = (|| {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(&payload)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(e));
    }

    Ok(())
}

/// `dir/name.ext` becomes `dir/name.ext.<suffix>`
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
