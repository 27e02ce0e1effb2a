//! Cloud configuration lifecycle.
//!
//! # States
//!
//! 1. **Unconfigured** - no credentials
//! 2. **Validating** - credentials submitted, connection probe in flight
//! 3. **ConfiguredSignedOut** - connected, nobody signed in
//! 4. **ConfiguredSignedIn** - connected and the provider has a session
//! 5. **ConfiguredInvalid** - the probe failed for the current credentials
//!
//! Credentials reach the `cloud-config.json` slot only after a successful
//! probe, and leave it only through [`Lifecycle::disconnect`]. Whether a user
//! is signed in is never stored here: it is read from the provider's session
//! channel every time [`Lifecycle::state`] is called.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use thiserror::Error;
use tokio::sync::watch;

use super::backend::{CloudConnector, CloudHandle, IdentityProvider};
use super::config::{CloudConfig, ConfigError};
use super::error::{AuthError, CloudError};
use super::session::AuthSession;
use super::store::CloudStore;
use crate::local::{Slot, SlotStorage, StorageError};

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error("Configuration invalid: {0}")]
    InitFailed(#[source] CloudError),

    #[error("Cloud sync is not configured")]
    NotConfigured,

    #[error("Cloud configuration could not be validated ({0}); run 'cloud connect' again")]
    NeedsReconnect(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Failed to store cloud configuration: {0}")]
    Storage(#[from] StorageError),
}

/// Observable lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Unconfigured,
    Validating,
    ConfiguredSignedOut,
    ConfiguredSignedIn(AuthSession),
    ConfiguredInvalid(String),
}

impl LifecycleState {
    pub fn is_configured(&self) -> bool {
        matches!(
            self,
            LifecycleState::ConfiguredSignedOut
                | LifecycleState::ConfiguredSignedIn(_)
                | LifecycleState::ConfiguredInvalid(_)
        )
    }

    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            LifecycleState::ConfiguredSignedIn(session) => Some(session),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Unconfigured => write!(f, "not configured"),
            LifecycleState::Validating => write!(f, "validating"),
            LifecycleState::ConfiguredSignedOut => write!(f, "configured, signed out"),
            LifecycleState::ConfiguredSignedIn(session) => {
                write!(f, "signed in as {}", session.user.label())
            }
            LifecycleState::ConfiguredInvalid(reason) => {
                write!(f, "configuration invalid: {}", reason)
            }
        }
    }
}

type Listener = Box<dyn Fn(Option<&AuthSession>) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Registration of an auth-change listener. Dropping it deregisters the
/// listener.
#[must_use = "dropping a Subscription immediately deregisters the listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            let mut listeners = listeners.lock().unwrap_or_else(|p| p.into_inner());
            listeners.entries.retain(|(id, _)| *id != self.id);
        }
    }
}

enum Phase {
    Unconfigured,
    Validating,
    Connected {
        config: CloudConfig,
        handle: CloudHandle,
        sessions: watch::Receiver<Option<AuthSession>>,
    },
    Invalid {
        config: CloudConfig,
        reason: String,
    },
}

pub struct Lifecycle {
    storage: SlotStorage,
    connector: Arc<dyn CloudConnector>,
    phase: Phase,
    listeners: Arc<Mutex<Listeners>>,
    /// uid of the session listeners were last told about.
    notified_uid: Option<String>,
}

impl Lifecycle {
    pub fn new(storage: SlotStorage, connector: Arc<dyn CloudConnector>) -> Self {
        Self {
            storage,
            connector,
            phase: Phase::Unconfigured,
            listeners: Arc::new(Mutex::new(Listeners::default())),
            notified_uid: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        match &self.phase {
            Phase::Unconfigured => LifecycleState::Unconfigured,
            Phase::Validating => LifecycleState::Validating,
            Phase::Connected { sessions, .. } => match sessions.borrow().clone() {
                Some(session) => LifecycleState::ConfiguredSignedIn(session),
                None => LifecycleState::ConfiguredSignedOut,
            },
            Phase::Invalid { reason, .. } => LifecycleState::ConfiguredInvalid(reason.clone()),
        }
    }

    /// Credentials currently in use, valid or not.
    pub fn config(&self) -> Option<&CloudConfig> {
        match &self.phase {
            Phase::Connected { config, .. } | Phase::Invalid { config, .. } => Some(config),
            _ => None,
        }
    }

    /// A record store bound to the current session, if connected.
    pub fn cloud_store(&self) -> Option<CloudStore> {
        match &self.phase {
            Phase::Connected {
                handle, sessions, ..
            } => Some(CloudStore::new(
                handle.documents.clone(),
                sessions.borrow().clone(),
            )),
            _ => None,
        }
    }

    /// Registers a listener for authentication changes.
    ///
    /// Listeners run synchronously while the lifecycle is being mutated and
    /// must not call back into it.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&AuthSession>) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock().unwrap_or_else(|p| p.into_inner());
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Box::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Re-initializes persisted credentials, if any.
    ///
    /// Uses the same initialization as [`Lifecycle::submit`], ending in
    /// `ConfiguredSignedOut`/`ConfiguredSignedIn` or `ConfiguredInvalid`.
    pub async fn start(&mut self) -> LifecycleState {
        if let Some(config) = self.load_persisted() {
            if let Err(e) = self.initialize(config, false).await {
                tracing::warn!("Stored cloud configuration could not be used: {}", e);
            }
        }
        self.poll_session();
        self.state()
    }

    /// Validates, probes and (on success) stores new credentials.
    ///
    /// A structurally incomplete config fails before anything else happens
    /// and leaves the state unchanged. A failed probe moves to
    /// `ConfiguredInvalid` without touching previously stored credentials.
    pub async fn submit(&mut self, config: CloudConfig) -> Result<(), LifecycleError> {
        config.validate()?;
        let result = self.initialize(config, true).await;
        self.poll_session();
        result
    }

    pub async fn sign_in(&mut self) -> Result<AuthSession, LifecycleError> {
        if let Phase::Invalid { reason, .. } = &self.phase {
            return Err(LifecycleError::NeedsReconnect(reason.clone()));
        }
        let identity = self.identity().ok_or(LifecycleError::NotConfigured)?;
        let result = identity.sign_in().await;
        self.poll_session();

        match result {
            Ok(session) => {
                tracing::info!("Signed in as {}", session.uid());
                Ok(session)
            }
            Err(e) => {
                tracing::warn!("Sign-in failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Signs out. Does nothing when not connected.
    pub async fn sign_out(&mut self) -> Result<(), LifecycleError> {
        let Some(identity) = self.identity() else {
            return Ok(());
        };
        let result = identity.sign_out().await;
        self.poll_session();
        result.map_err(LifecycleError::from)
    }

    /// Forgets the credentials and returns to `Unconfigured`.
    ///
    /// The stored slot is erased first; if that fails nothing else changes.
    pub async fn disconnect(&mut self) -> Result<(), LifecycleError> {
        self.storage.remove(Slot::CloudConfig)?;

        if let Some(identity) = self.identity() {
            if let Err(e) = identity.sign_out().await {
                tracing::warn!("Sign-out during disconnect failed: {}", e);
            }
        }

        self.phase = Phase::Unconfigured;
        tracing::info!("Cloud configuration removed");
        self.poll_session();
        Ok(())
    }

    /// Notifies listeners if the session changed since they were last told.
    ///
    /// Returns true if listeners were notified.
    pub fn poll_session(&mut self) -> bool {
        let session = match self.state() {
            LifecycleState::ConfiguredSignedIn(session) => Some(session),
            _ => None,
        };
        let uid = session.as_ref().map(|s| s.uid().to_string());
        if uid == self.notified_uid {
            return false;
        }

        self.notified_uid = uid;
        let listeners = self.listeners.lock().unwrap_or_else(|p| p.into_inner());
        for (_, listener) in &listeners.entries {
            listener(session.as_ref());
        }
        true
    }

    fn identity(&self) -> Option<Arc<dyn IdentityProvider>> {
        match &self.phase {
            Phase::Connected { handle, .. } => Some(handle.identity.clone()),
            _ => None,
        }
    }

    fn load_persisted(&self) -> Option<CloudConfig> {
        let contents = match self.storage.read(Slot::CloudConfig) {
            Ok(contents) => contents?,
            Err(e) => {
                tracing::warn!("Failed to read stored cloud configuration: {}", e);
                return None;
            }
        };
        match CloudConfig::from_json(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Ignoring stored cloud configuration: {}", e);
                None
            }
        }
    }

    async fn initialize(&mut self, config: CloudConfig, persist: bool) -> Result<(), LifecycleError> {
        let previous = std::mem::replace(&mut self.phase, Phase::Validating);

        let handle = match self.connector.connect(&config).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(
                    "Cloud initialization failed for project {}: {}",
                    config.project_id,
                    e
                );
                self.phase = Phase::Invalid {
                    config,
                    reason: e.to_string(),
                };
                return Err(LifecycleError::InitFailed(e));
            }
        };

        if persist {
            let stored = serde_json::to_string(&config)
                .map_err(StorageError::from)
                .and_then(|json| self.storage.write(Slot::CloudConfig, &json));
            if let Err(e) = stored {
                self.phase = previous;
                return Err(e.into());
            }
        }

        tracing::info!("Connected to cloud project {}", config.project_id);
        let sessions = handle.identity.sessions();
        self.phase = Phase::Connected {
            config,
            handle,
            sessions,
        };
        Ok(())
    }
}
