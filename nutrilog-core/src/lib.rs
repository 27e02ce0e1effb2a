//! Nutrilog Core Library
//!
//! Meal records, local slot storage, the cloud lifecycle and the
//! coordinator that routes every write to exactly one backend.

pub mod analysis;
pub mod backup;
pub mod cloud;
pub mod coordinator;
pub mod local;
pub mod models;
pub mod summary;

pub use analysis::{AnalysisError, MealAnalyzer, MealImage};
pub use backup::{backup_file_name, export_backup, parse_backup, BackupError};
pub use cloud::{
    AuthError, AuthSession, CloudConfig, CloudConnector, CloudError, CloudHandle, CloudStore,
    ConfigError, DocumentStore, IdentityProvider, Lifecycle, LifecycleError, LifecycleState,
    Subscription, UserProfile,
};
pub use coordinator::{Coordinator, CoordinatorError, ImportSummary, Notice, Route};
pub use local::{LocalStore, ModelPreference, Slot, SlotStorage, StorageError};
pub use models::{MacroProfile, MealAnalysis, MealRecord};
pub use summary::{ChartPoint, TimeRange, DAILY_TARGETS};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
