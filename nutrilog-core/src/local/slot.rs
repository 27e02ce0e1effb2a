//! Fixed key-value slots persisted as files in the data directory.

use std::fs;
use std::io;
use std::path::PathBuf;

/// The well-known slots this application stores locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// JSON array of every meal record.
    Meals,
    /// JSON object with the validated cloud credentials.
    CloudConfig,
    /// Plain-text identifier of the selected analysis model.
    Model,
}

impl Slot {
    /// Returns the filename backing this slot.
    pub fn filename(&self) -> &'static str {
        match self {
            Slot::Meals => "meals.json",
            Slot::CloudConfig => "cloud-config.json",
            Slot::Model => "model.txt",
        }
    }
}

/// Reads and writes whole slots.
///
/// Each write replaces the slot in one step (temporary file, then rename),
/// so readers see either the old content or the new content.
#[derive(Debug, Clone)]
pub struct SlotStorage {
    data_dir: PathBuf,
}

impl SlotStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Returns the full path for a slot.
    pub fn path(&self, slot: Slot) -> PathBuf {
        self.data_dir.join(slot.filename())
    }

    pub fn exists(&self, slot: Slot) -> bool {
        self.path(slot).exists()
    }

    /// Reads a slot.
    ///
    /// Returns `Ok(None)` if the slot has never been written.
    pub fn read(&self, slot: Slot) -> Result<Option<String>, StorageError> {
        let path = self.path(slot);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(path, e)),
        }
    }

    /// Replaces the contents of a slot, creating the data directory if needed.
    pub fn write(&self, slot: Slot, contents: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StorageError::IoError(self.data_dir.clone(), e))?;

        let path = self.path(slot);
        let tmp = self.data_dir.join(format!(".{}.tmp", slot.filename()));

        fs::write(&tmp, contents).map_err(|e| StorageError::IoError(tmp.clone(), e))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::IoError(path, e))?;

        Ok(())
    }

    /// Removes a slot. Removing a slot that does not exist is not an error.
    pub fn remove(&self, slot: Slot) -> Result<(), StorageError> {
        let path = self.path(slot);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::IoError(path, e)),
        }
    }
}

/// Errors that can occur while reading or writing slots.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// The value could not be serialized for storage.
    SerializeError(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            StorageError::SerializeError(e) => write!(f, "Failed to serialize slot: {}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(_, e) => Some(e),
            StorageError::SerializeError(_) => None,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::SerializeError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_storage() -> (SlotStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = SlotStorage::new(temp_dir.path().to_path_buf());
        (storage, temp_dir)
    }

    #[test]
    fn test_slot_filename() {
        assert_eq!(Slot::Meals.filename(), "meals.json");
        assert_eq!(Slot::CloudConfig.filename(), "cloud-config.json");
        assert_eq!(Slot::Model.filename(), "model.txt");
    }

    #[test]
    fn test_read_missing_returns_none() {
        let (storage, _temp) = test_storage();
        assert!(storage.read(Slot::Meals).unwrap().is_none());
        assert!(!storage.exists(Slot::Meals));
    }

    #[test]
    fn test_write_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested").join("data");
        let storage = SlotStorage::new(nested.clone());

        storage.write(Slot::Model, "gemini-2.5-flash").unwrap();

        assert!(nested.exists());
        assert_eq!(
            storage.read(Slot::Model).unwrap().as_deref(),
            Some("gemini-2.5-flash")
        );
    }

    #[test]
    fn test_write_overwrites_and_leaves_no_temp_file() {
        let (storage, temp) = test_storage();
        storage.write(Slot::Meals, "[1]").unwrap();
        storage.write(Slot::Meals, "[2]").unwrap();

        assert_eq!(storage.read(Slot::Meals).unwrap().as_deref(), Some("[2]"));
        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_slots_are_independent() {
        let (storage, _temp) = test_storage();
        storage.write(Slot::Meals, "[]").unwrap();
        storage.write(Slot::CloudConfig, "{}").unwrap();

        storage.remove(Slot::CloudConfig).unwrap();

        assert!(storage.exists(Slot::Meals));
        assert!(!storage.exists(Slot::CloudConfig));
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let (storage, _temp) = test_storage();
        assert!(storage.remove(Slot::Model).is_ok());
    }
}
