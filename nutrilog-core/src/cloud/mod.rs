//! Cloud persistence: credentials, sign-in lifecycle and the per-user
//! record store.
//!
//! Vendor specifics stay behind the traits in [`backend`]; everything here
//! works against those traits only.

pub mod backend;
mod config;
mod error;
#[cfg(test)]
pub(crate) mod fakes;
mod lifecycle;
mod session;
mod store;

pub use backend::{CloudConnector, CloudHandle, DocumentStore, IdentityProvider};
pub use config::{CloudConfig, ConfigError};
pub use error::{AuthError, CloudError};
pub use lifecycle::{Lifecycle, LifecycleError, LifecycleState, Subscription};
pub use session::{AuthSession, UserProfile};
pub use store::CloudStore;
