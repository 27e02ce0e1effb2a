//! In-memory implementations of the cloud capability traits for tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;

use super::backend::{CloudConnector, CloudHandle, DocumentStore, IdentityProvider};
use super::config::CloudConfig;
use super::error::{AuthError, CloudError};
use super::session::{AuthSession, UserProfile};
use crate::models::{sort_newest_first, MealRecord};

pub fn signed_in(uid: &str) -> AuthSession {
    AuthSession::new(UserProfile::new(uid), format!("token-{}", uid))
}

#[derive(Default)]
pub struct FakeDocumentStore {
    users: Mutex<HashMap<String, BTreeMap<String, MealRecord>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    failing_ids: Mutex<HashSet<String>>,
    pub upserts: AtomicUsize,
}

impl FakeDocumentStore {
    pub fn seed(&self, uid: &str, records: Vec<MealRecord>) {
        let mut users = self.users.lock().unwrap();
        let docs = users.entry(uid.to_string()).or_default();
        for record in records {
            docs.insert(record.id.clone(), record);
        }
    }

    pub fn records(&self, uid: &str) -> Vec<MealRecord> {
        let users = self.users.lock().unwrap();
        let mut records: Vec<_> = users
            .get(uid)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();
        sort_newest_first(&mut records);
        records
    }

    pub fn is_empty(&self, uid: &str) -> bool {
        self.records(uid).is_empty()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_id(&self, id: &str) {
        self.failing_ids.lock().unwrap().insert(id.to_string());
    }

    fn write_error(&self, id: &str) -> Option<CloudError> {
        if self.fail_writes.load(Ordering::SeqCst) || self.failing_ids.lock().unwrap().contains(id)
        {
            Some(CloudError::Network("connection reset".to_string()))
        } else {
            None
        }
    }
}

#[async_trait]
impl DocumentStore for FakeDocumentStore {
    async fn fetch_all(&self, session: &AuthSession) -> Result<Vec<MealRecord>, CloudError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CloudError::Network("offline".to_string()));
        }
        Ok(self.records(session.uid()))
    }

    async fn upsert(&self, session: &AuthSession, record: &MealRecord) -> Result<(), CloudError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.write_error(&record.id) {
            return Err(e);
        }
        self.seed(session.uid(), vec![record.clone()]);
        Ok(())
    }

    async fn remove(&self, session: &AuthSession, id: &str) -> Result<(), CloudError> {
        if let Some(e) = self.write_error(id) {
            return Err(e);
        }
        let mut users = self.users.lock().unwrap();
        if let Some(docs) = users.get_mut(session.uid()) {
            docs.remove(id);
        }
        Ok(())
    }
}

pub struct FakeIdentity {
    uid: String,
    sender: watch::Sender<Option<AuthSession>>,
    next_error: Mutex<Option<AuthError>>,
}

impl FakeIdentity {
    pub fn new(uid: &str) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            uid: uid.to_string(),
            sender,
            next_error: Mutex::new(None),
        }
    }

    /// Simulates a session the provider restored by itself.
    pub fn restore(&self) {
        self.sender.send_replace(Some(signed_in(&self.uid)));
    }

    /// Simulates the provider dropping the session (e.g. token revoked).
    pub fn expire(&self) {
        self.sender.send_replace(None);
    }

    pub fn fail_next_sign_in(&self, error: AuthError) {
        *self.next_error.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    fn sessions(&self) -> watch::Receiver<Option<AuthSession>> {
        self.sender.subscribe()
    }

    async fn sign_in(&self) -> Result<AuthSession, AuthError> {
        if let Some(e) = self.next_error.lock().unwrap().take() {
            return Err(e);
        }
        let session = signed_in(&self.uid);
        self.sender.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.sender.send_replace(None);
        Ok(())
    }
}

pub struct FakeConnector {
    pub documents: Arc<FakeDocumentStore>,
    pub identity: Arc<FakeIdentity>,
    reject: AtomicBool,
    pub connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(uid: &str) -> Self {
        Self {
            documents: Arc::new(FakeDocumentStore::default()),
            identity: Arc::new(FakeIdentity::new(uid)),
            reject: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl CloudConnector for FakeConnector {
    async fn connect(&self, config: &CloudConfig) -> Result<CloudHandle, CloudError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.reject.load(Ordering::SeqCst) {
            return Err(CloudError::Rejected {
                status: 400,
                message: format!("API key not valid for project {}", config.project_id),
            });
        }
        Ok(CloudHandle {
            documents: self.documents.clone(),
            identity: self.identity.clone(),
        })
    }
}
