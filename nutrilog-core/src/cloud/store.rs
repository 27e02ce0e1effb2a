use std::sync::Arc;

use super::backend::DocumentStore;
use super::error::CloudError;
use super::session::AuthSession;
use crate::models::{sort_newest_first, MealRecord};

/// The cloud record store, bound to whatever session was current when it
/// was handed out.
///
/// Every operation fails with [`CloudError::NotSignedIn`] when there is no
/// session instead of silently doing nothing.
#[derive(Clone)]
pub struct CloudStore {
    documents: Arc<dyn DocumentStore>,
    session: Option<AuthSession>,
}

impl CloudStore {
    pub fn new(documents: Arc<dyn DocumentStore>, session: Option<AuthSession>) -> Self {
        Self { documents, session }
    }

    pub fn session(&self) -> Option<&AuthSession> {
        self.session.as_ref()
    }

    fn require_session(&self) -> Result<&AuthSession, CloudError> {
        self.session.as_ref().ok_or(CloudError::NotSignedIn)
    }

    pub async fn fetch_all(&self) -> Result<Vec<MealRecord>, CloudError> {
        let session = self.require_session()?;
        let mut records = self.documents.fetch_all(session).await?;
        sort_newest_first(&mut records);
        Ok(records)
    }

    pub async fn upsert(&self, record: &MealRecord) -> Result<(), CloudError> {
        let session = self.require_session()?;
        self.documents.upsert(session, record).await
    }

    pub async fn remove(&self, id: &str) -> Result<(), CloudError> {
        let session = self.require_session()?;
        self.documents.remove(session, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::fakes::{signed_in, FakeDocumentStore};
    use crate::models::MealAnalysis;

    fn meal(id: &str, timestamp: i64) -> MealRecord {
        MealRecord::new("", MealAnalysis::default())
            .with_id(id)
            .with_timestamp(timestamp)
    }

    #[tokio::test]
    async fn test_operations_require_session() {
        let docs = Arc::new(FakeDocumentStore::default());
        let store = CloudStore::new(docs.clone(), None);

        assert_eq!(store.fetch_all().await, Err(CloudError::NotSignedIn));
        assert_eq!(store.upsert(&meal("a", 1)).await, Err(CloudError::NotSignedIn));
        assert_eq!(store.remove("a").await, Err(CloudError::NotSignedIn));
        assert!(docs.is_empty("u1"));
    }

    #[tokio::test]
    async fn test_upsert_is_keyed_by_id() {
        let docs = Arc::new(FakeDocumentStore::default());
        let store = CloudStore::new(docs.clone(), Some(signed_in("u1")));

        store.upsert(&meal("a", 1)).await.unwrap();
        store.upsert(&meal("a", 5)).await.unwrap();
        store.upsert(&meal("b", 3)).await.unwrap();

        let records = store.fetch_all().await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(records[0].timestamp, 5);

        store.remove("a").await.unwrap();
        assert_eq!(store.fetch_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_collections_are_per_user() {
        let docs = Arc::new(FakeDocumentStore::default());
        let alice = CloudStore::new(docs.clone(), Some(signed_in("alice")));
        let bob = CloudStore::new(docs.clone(), Some(signed_in("bob")));

        alice.upsert(&meal("a", 1)).await.unwrap();

        assert_eq!(alice.fetch_all().await.unwrap().len(), 1);
        assert!(bob.fetch_all().await.unwrap().is_empty());
    }
}
