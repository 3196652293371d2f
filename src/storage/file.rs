//! Directory-backed storage that survives process restarts

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tokio::sync::broadcast;
use tracing::debug;

use super::{Storage, StorageError, StorageEvent, EVENT_CHANNEL_CAPACITY};

/// Storage that keeps one JSON file per slot inside a directory
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
    events_tx: broadcast::Sender<StorageEvent>,
}

impl FileStorage {
    /// Open (and create if needed) a storage directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        debug!("Opened file storage at {}", dir.display());
        Ok(Self { dir, events_tx })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, slot: &str) -> PathBuf {
        let name: String = slot
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }

    fn notify(&self, slot: &str) {
        let _ = self.events_tx.send(StorageEvent {
            slot: slot.to_string(),
        });
    }
}

impl Storage for FileStorage {
    fn get(&self, slot: &str) -> Option<String> {
        match fs::read_to_string(self.path_for(slot)) {
            Ok(value) => Some(value),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                debug!("Failed to read slot {}: {}", slot, e);
                None
            }
        }
    }

    fn set(&self, slot: &str, value: &str) -> Result<(), StorageError> {
        // Each write gets its own temp file so concurrent writers never tear
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(self.path_for(slot)).map_err(|e| e.error)?;
        self.notify(slot);
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(slot)) {
            Ok(()) => {
                self.notify(slot);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events_tx.subscribe()
    }
}
