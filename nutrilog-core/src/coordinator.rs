//! Persistence coordinator.
//!
//! Owns the in-memory meal list and decides, per operation, whether it goes
//! to the local store or the cloud store. The decision is recomputed from
//! [`Lifecycle::state`] every time: cloud iff signed in, local otherwise.
//!
//! Cloud writes are optimistic. The in-memory list changes first, then the
//! remote call runs; a failed remote call leaves a [`Notice`] and the list
//! as it is.

use std::collections::HashSet;
use std::fmt;

use futures::future::try_join_all;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::cloud::{
    AuthSession, CloudConfig, CloudError, CloudStore, Lifecycle, LifecycleError, LifecycleState,
    Subscription,
};
use crate::local::{LocalStore, StorageError};
use crate::models::{sort_newest_first, upsert_sorted, MealRecord};

/// Where an operation was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Local,
    Cloud,
}

impl Route {
    pub fn for_state(state: &LifecycleState) -> Self {
        match state {
            LifecycleState::ConfiguredSignedIn(_) => Route::Cloud,
            _ => Route::Local,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Local => write!(f, "local"),
            Route::Cloud => write!(f, "cloud"),
        }
    }
}

/// A non-fatal failure the user should be told about.
#[derive(Debug)]
pub enum Notice {
    RemoteWriteFailed { id: String, error: CloudError },
    RemoteDeleteFailed { id: String, error: CloudError },
    RemoteFetchFailed(CloudError),
    LocalWriteFailed(StorageError),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::RemoteWriteFailed { id, error } => {
                write!(f, "Saved locally but cloud upload of {} failed: {}", id, error)
            }
            Notice::RemoteDeleteFailed { id, error } => {
                write!(f, "Removed locally but cloud delete of {} failed: {}", id, error)
            }
            Notice::RemoteFetchFailed(error) => {
                write!(f, "Could not load meals from the cloud: {}", error)
            }
            Notice::LocalWriteFailed(error) => {
                write!(f, "Could not write meals to local storage: {}", error)
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Cloud upload failed: {0}")]
    Cloud(#[from] CloudError),

    #[error("Local storage failed: {0}")]
    Storage(#[from] StorageError),
}

/// Outcome of a backup import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    /// Records in the backup.
    pub found: usize,
    /// Records whose id was not already present.
    pub added: usize,
    pub route: Route,
}

pub struct Coordinator {
    local: LocalStore,
    lifecycle: Lifecycle,
    records: Vec<MealRecord>,
    notices: Vec<Notice>,
    session_changes: mpsc::UnboundedReceiver<Option<String>>,
    _subscription: Subscription,
}

impl Coordinator {
    pub fn new(local: LocalStore, lifecycle: Lifecycle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = lifecycle.subscribe(move |session| {
            let _ = tx.send(session.map(|s| s.uid().to_string()));
        });

        Self {
            local,
            lifecycle,
            records: Vec::new(),
            notices: Vec::new(),
            session_changes: rx,
            _subscription: subscription,
        }
    }

    pub fn records(&self) -> &[MealRecord] {
        &self.records
    }

    pub fn find(&self, id: &str) -> Option<&MealRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn route(&self) -> Route {
        Route::for_state(&self.lifecycle.state())
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Starts the lifecycle and loads the initial record list from wherever
    /// the resulting state routes to.
    pub async fn initialize(&mut self) -> Route {
        self.lifecycle.start().await;
        self.drain_session_changes();
        self.reload().await
    }

    /// Delivers pending auth changes. Any change reloads the record list
    /// from the newly routed store.
    pub async fn apply_session_changes(&mut self) -> bool {
        self.lifecycle.poll_session();
        if !self.drain_session_changes() {
            return false;
        }
        self.reload().await;
        true
    }

    pub async fn save(&mut self, record: MealRecord) -> Route {
        self.apply_session_changes().await;
        let route = self.route();
        match route {
            Route::Local => match self.local.upsert(record.clone()) {
                Ok(records) => self.records = records,
                Err(e) => {
                    tracing::warn!("Failed to save meal {} locally: {}", record.id, e);
                    upsert_sorted(&mut self.records, record);
                    self.notices.push(Notice::LocalWriteFailed(e));
                }
            },
            Route::Cloud => {
                upsert_sorted(&mut self.records, record.clone());
                let result = match self.cloud_store() {
                    Ok(store) => store.upsert(&record).await,
                    Err(e) => Err(e),
                };
                if let Err(error) = result {
                    tracing::warn!("Cloud upload of meal {} failed: {}", record.id, error);
                    self.notices.push(Notice::RemoteWriteFailed {
                        id: record.id,
                        error,
                    });
                }
            }
        }
        route
    }

    pub async fn delete(&mut self, id: &str) -> Route {
        self.apply_session_changes().await;
        let route = self.route();
        match route {
            Route::Local => match self.local.remove(id) {
                Ok(records) => self.records = records,
                Err(e) => {
                    tracing::warn!("Failed to delete meal {} locally: {}", id, e);
                    self.records.retain(|r| r.id != id);
                    self.notices.push(Notice::LocalWriteFailed(e));
                }
            },
            Route::Cloud => {
                self.records.retain(|r| r.id != id);
                let result = match self.cloud_store() {
                    Ok(store) => store.remove(id).await,
                    Err(e) => Err(e),
                };
                if let Err(error) = result {
                    tracing::warn!("Cloud delete of meal {} failed: {}", id, error);
                    self.notices.push(Notice::RemoteDeleteFailed {
                        id: id.to_string(),
                        error,
                    });
                }
            }
        }
        route
    }

    /// Merges backup records into the current list.
    ///
    /// Only ids not already present are added; existing records are never
    /// replaced, even if the backup holds a different version. In the cloud
    /// every new record is uploaded and all uploads must succeed before the
    /// merged list is adopted. Locally the merged list is written in one go.
    pub async fn import_backup(
        &mut self,
        imported: Vec<MealRecord>,
    ) -> Result<ImportSummary, CoordinatorError> {
        self.apply_session_changes().await;
        let found = imported.len();
        let mut seen: HashSet<String> = self.records.iter().map(|r| r.id.clone()).collect();
        let new_records: Vec<MealRecord> = imported
            .into_iter()
            .filter(|r| seen.insert(r.id.clone()))
            .collect();

        let mut combined = new_records.clone();
        combined.extend(self.records.iter().cloned());
        sort_newest_first(&mut combined);

        let route = self.route();
        match route {
            Route::Cloud => {
                let store = self.cloud_store()?;
                try_join_all(new_records.iter().map(|r| store.upsert(r))).await?;
            }
            Route::Local => self.local.replace_all(&combined)?,
        }

        tracing::info!(
            "Imported {} new meal(s) of {} via {} store",
            new_records.len(),
            found,
            route
        );
        self.records = combined;

        Ok(ImportSummary {
            found,
            added: new_records.len(),
            route,
        })
    }

    /// Empties the local store and the in-memory list. Cloud documents are
    /// left alone.
    pub fn clear_all(&mut self) -> Result<(), StorageError> {
        self.local.clear()?;
        self.records.clear();
        Ok(())
    }

    /// Re-fetches the full cloud collection, replacing the in-memory list.
    ///
    /// On failure the current list is kept. A pending auth change is
    /// applied first, so a lapsed session leaves the local list loaded.
    pub async fn resync(&mut self) -> Result<usize, CloudError> {
        self.apply_session_changes().await;

        if self.route() != Route::Cloud {
            return Err(CloudError::NotSignedIn);
        }
        let records = self.cloud_store()?.fetch_all().await?;
        self.records = records;
        Ok(self.records.len())
    }

    pub async fn submit_config(&mut self, config: CloudConfig) -> Result<(), LifecycleError> {
        let result = self.lifecycle.submit(config).await;
        self.apply_session_changes().await;
        result
    }

    pub async fn sign_in(&mut self) -> Result<AuthSession, LifecycleError> {
        let result = self.lifecycle.sign_in().await;
        self.apply_session_changes().await;
        result
    }

    pub async fn sign_out(&mut self) -> Result<(), LifecycleError> {
        let result = self.lifecycle.sign_out().await;
        self.apply_session_changes().await;
        result
    }

    pub async fn disconnect(&mut self) -> Result<(), LifecycleError> {
        let result = self.lifecycle.disconnect().await;
        self.apply_session_changes().await;
        result
    }

    fn cloud_store(&self) -> Result<CloudStore, CloudError> {
        self.lifecycle
            .cloud_store()
            .ok_or(CloudError::NotConfigured)
    }

    fn drain_session_changes(&mut self) -> bool {
        let mut changed = false;
        while self.session_changes.try_recv().is_ok() {
            changed = true;
        }
        changed
    }

    async fn reload(&mut self) -> Route {
        let route = self.route();
        self.records = match route {
            Route::Local => self.local.load(),
            Route::Cloud => {
                let result = match self.cloud_store() {
                    Ok(store) => store.fetch_all().await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(records) => records,
                    Err(e) => {
                        tracing::warn!("Failed to fetch meals from the cloud: {}", e);
                        self.notices.push(Notice::RemoteFetchFailed(e));
                        Vec::new()
                    }
                }
            }
        };
        route
    }
}
