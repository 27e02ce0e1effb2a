//! On-device persistence.
//!
//! Everything local lives in three fixed slots inside the data directory:
//!
//! ```text
//! ~/.local/share/nutrilog/
//! ├── meals.json          # every meal record, newest first
//! ├── cloud-config.json   # validated cloud credentials (absent if unconfigured)
//! └── model.txt           # selected analysis model
//! ```

mod model;
mod slot;
mod store;

pub use model::{ModelPreference, DEFAULT_MODEL, KNOWN_MODELS};
pub use slot::{Slot, SlotStorage, StorageError};
pub use store::LocalStore;
