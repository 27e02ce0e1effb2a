//! The selected analysis model, kept in its own slot.

use super::slot::{Slot, SlotStorage, StorageError};

/// Model used when none has been selected.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Models offered by `model list`. Any other identifier is still accepted.
pub const KNOWN_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.5-pro", "gemini-2.0-flash"];

#[derive(Debug, Clone)]
pub struct ModelPreference {
    storage: SlotStorage,
}

impl ModelPreference {
    pub fn new(storage: SlotStorage) -> Self {
        Self { storage }
    }

    /// The selected model, falling back to [`DEFAULT_MODEL`].
    pub fn get(&self) -> String {
        match self.storage.read(Slot::Model) {
            Ok(Some(model)) if !model.trim().is_empty() => model.trim().to_string(),
            Ok(_) => DEFAULT_MODEL.to_string(),
            Err(e) => {
                tracing::warn!("Failed to read model selection: {}", e);
                DEFAULT_MODEL.to_string()
            }
        }
    }

    pub fn set(&self, model: &str) -> Result<(), StorageError> {
        self.storage.write(Slot::Model, model.trim())
    }

    pub fn reset(&self) -> Result<(), StorageError> {
        self.storage.remove(Slot::Model)
    }
}
