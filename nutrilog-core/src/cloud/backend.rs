//! Capability traits implemented by a concrete cloud vendor.
//!
//! The lifecycle and coordinator only ever see these traits, so they can be
//! driven by in-memory fakes in tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use super::config::CloudConfig;
use super::error::{AuthError, CloudError};
use super::session::AuthSession;
use crate::models::MealRecord;

/// Per-user document collection, one document per record keyed by its id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every record of the session's user, newest first.
    async fn fetch_all(&self, session: &AuthSession) -> Result<Vec<MealRecord>, CloudError>;

    /// Creates or overwrites the document named `record.id`.
    async fn upsert(&self, session: &AuthSession, record: &MealRecord) -> Result<(), CloudError>;

    async fn remove(&self, session: &AuthSession, id: &str) -> Result<(), CloudError>;
}

/// Third-party sign-in.
///
/// The provider owns the current session and publishes every change on the
/// channel returned by [`IdentityProvider::sessions`], including a session
/// it restored on its own when it was created.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn sessions(&self) -> watch::Receiver<Option<AuthSession>>;

    async fn sign_in(&self) -> Result<AuthSession, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// An initialized connection to the cloud project.
#[derive(Clone)]
pub struct CloudHandle {
    pub documents: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl std::fmt::Debug for CloudHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudHandle").finish_non_exhaustive()
    }
}

/// Turns credentials into a live handle.
///
/// `connect` is the initialization probe: it must fail if the credentials
/// are not usable, since that is the only way to learn whether they are.
#[async_trait]
pub trait CloudConnector: Send + Sync {
    async fn connect(&self, config: &CloudConfig) -> Result<CloudHandle, CloudError>;
}
