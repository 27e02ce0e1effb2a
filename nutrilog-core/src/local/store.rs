//! The on-device record store: every meal in one JSON array slot.

use crate::models::{sort_newest_first, upsert_sorted, MealRecord};

use super::slot::{Slot, SlotStorage, StorageError};

/// Local meal record store.
///
/// Every call reads the whole slot, applies its change and writes the whole
/// slot back. Nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct LocalStore {
    storage: SlotStorage,
}

impl LocalStore {
    pub fn new(storage: SlotStorage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &SlotStorage {
        &self.storage
    }

    /// Loads every record, newest first.
    ///
    /// An unreadable or malformed slot is logged and treated as empty.
    pub fn load(&self) -> Vec<MealRecord> {
        let contents = match self.storage.read(Slot::Meals) {
            Ok(Some(contents)) => contents,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read local meals: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<MealRecord>>(&contents) {
            Ok(mut records) => {
                sort_newest_first(&mut records);
                records
            }
            Err(e) => {
                tracing::warn!(
                    "Local meals at {} are malformed, treating as empty: {}",
                    self.storage.path(Slot::Meals).display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Replaces the record with the same id in place, or prepends it.
    pub fn upsert(&self, record: MealRecord) -> Result<Vec<MealRecord>, StorageError> {
        let mut records = self.load();
        upsert_sorted(&mut records, record);
        self.replace_all(&records)?;
        Ok(records)
    }

    /// Removes the record with the given id. Unknown ids are ignored.
    pub fn remove(&self, id: &str) -> Result<Vec<MealRecord>, StorageError> {
        let mut records = self.load();
        records.retain(|r| r.id != id);
        self.replace_all(&records)?;
        Ok(records)
    }

    /// Overwrites the slot with exactly `records`.
    pub fn replace_all(&self, records: &[MealRecord]) -> Result<(), StorageError> {
        let json = serde_json::to_string(records)?;
        self.storage.write(Slot::Meals, &json)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(Slot::Meals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MacroProfile, MealAnalysis};
    use tempfile::TempDir;

    fn test_store() -> (LocalStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(SlotStorage::new(temp_dir.path().to_path_buf()));
        (store, temp_dir)
    }

    fn meal(id: &str, timestamp: i64, calories: f64) -> MealRecord {
        MealRecord::new(
            format!("meal {}", id),
            MealAnalysis::new(MacroProfile::new(calories, 0.0, 0.0, 0.0, 0.0), id),
        )
        .with_id(id)
        .with_timestamp(timestamp)
    }

    fn ids(records: &[MealRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_load_empty_slot() {
        let (store, _temp) = test_store();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_malformed_slot_is_empty() {
        let (store, _temp) = test_store();
        store.storage().write(Slot::Meals, "{not json").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_upsert_returns_newest_first() {
        let (store, _temp) = test_store();
        store.upsert(meal("a", 100, 500.0)).unwrap();
        let records = store.upsert(meal("b", 200, 300.0)).unwrap();

        assert_eq!(ids(&records), vec!["b", "a"]);
        assert_eq!(ids(&store.load()), vec!["b", "a"]);
    }

    #[test]
    fn test_upsert_same_id_keeps_one_record_with_latest_content() {
        let (store, _temp) = test_store();
        store.upsert(meal("a", 100, 500.0)).unwrap();
        store.upsert(meal("b", 200, 300.0)).unwrap();
        let records = store.upsert(meal("a", 300, 650.0)).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(ids(&records), vec!["a", "b"]);
        assert_eq!(records[0].analysis.macros.calories, 650.0);
    }

    #[test]
    fn test_remove() {
        let (store, _temp) = test_store();
        store.upsert(meal("a", 100, 1.0)).unwrap();
        store.upsert(meal("b", 200, 1.0)).unwrap();
        store.upsert(meal("c", 300, 1.0)).unwrap();

        let records = store.remove("b").unwrap();
        assert_eq!(ids(&records), vec!["c", "a"]);

        let records = store.remove("missing").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_every_operation_keeps_descending_order() {
        let (store, _temp) = test_store();
        for (id, ts) in [("a", 50), ("b", 500), ("c", 5), ("d", 250)] {
            let records = store.upsert(meal(id, ts, 1.0)).unwrap();
            assert!(records.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
        }
        let records = store.remove("d").unwrap();
        assert!(records.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
    }

    #[test]
    fn test_load_sorts_unsorted_slot() {
        let (store, _temp) = test_store();
        store
            .replace_all(&[meal("old", 1, 1.0), meal("new", 2, 1.0)])
            .unwrap();
        assert_eq!(ids(&store.load()), vec!["new", "old"]);
    }

    #[test]
    fn test_clear() {
        let (store, _temp) = test_store();
        store.upsert(meal("a", 100, 1.0)).unwrap();
        store.clear().unwrap();
        assert!(store.load().is_empty());
        assert!(!store.storage().exists(Slot::Meals));
    }
}
