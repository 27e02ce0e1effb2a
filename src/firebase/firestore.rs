//! Meal documents in Cloud Firestore, one collection per user:
//! `users/{uid}/meals/{id}`.

use async_trait::async_trait;
use serde_json::{json, Value};

use nutrilog_core::{AuthSession, CloudError, DocumentStore, MealRecord};

use super::value::{document_to_record, record_to_document};
use super::{api_error, network_error, FIRESTORE_URL};

pub struct FirestoreStore {
    client: reqwest::Client,
    project_id: String,
}

impl FirestoreStore {
    pub fn new(client: reqwest::Client, project_id: impl Into<String>) -> Self {
        Self {
            client,
            project_id: project_id.into(),
        }
    }

    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            FIRESTORE_URL,
            urlencoding::encode(&self.project_id)
        )
    }

    fn user_path(&self, uid: &str) -> String {
        format!("{}/users/{}", self.documents_root(), urlencoding::encode(uid))
    }

    fn meal_path(&self, uid: &str, id: &str) -> String {
        format!("{}/meals/{}", self.user_path(uid), urlencoding::encode(id))
    }
}

fn newest_first_query() -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": "meals" }],
            "orderBy": [{ "field": { "fieldPath": "timestamp" }, "direction": "DESCENDING" }]
        }
    })
}

/// Records from a `runQuery` response. Entries without a document (the
/// trailing read-time marker) are skipped.
fn records_from_query(rows: &[Value]) -> Result<Vec<MealRecord>, CloudError> {
    rows.iter()
        .filter_map(|row| row.get("document"))
        .map(document_to_record)
        .collect()
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn fetch_all(&self, session: &AuthSession) -> Result<Vec<MealRecord>, CloudError> {
        let url = format!("{}:runQuery", self.user_path(session.uid()));
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&session.credential)
            .json(&newest_first_query())
            .send()
            .await
            .map_err(network_error)?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| CloudError::InvalidResponse(e.to_string()))?;
        records_from_query(&rows)
    }

    async fn upsert(&self, session: &AuthSession, record: &MealRecord) -> Result<(), CloudError> {
        let url = self.meal_path(session.uid(), &record.id);
        tracing::debug!("PATCH {}", url);

        let response = self
            .client
            .patch(&url)
            .bearer_auth(&session.credential)
            .json(&record_to_document(record)?)
            .send()
            .await
            .map_err(network_error)?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    async fn remove(&self, session: &AuthSession, id: &str) -> Result<(), CloudError> {
        let url = self.meal_path(session.uid(), id);
        tracing::debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&session.credential)
            .send()
            .await
            .map_err(network_error)?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let store = FirestoreStore::new(reqwest::Client::new(), "my-proj");
        assert_eq!(
            store.meal_path("u 1", "m1"),
            "https://firestore.googleapis.com/v1/projects/my-proj/databases/(default)/documents/users/u%201/meals/m1"
        );
    }

    #[test]
    fn test_query_orders_by_timestamp_desc() {
        let query = newest_first_query();
        let order = &query["structuredQuery"]["orderBy"][0];
        assert_eq!(order["field"]["fieldPath"], "timestamp");
        assert_eq!(order["direction"], "DESCENDING");
        assert_eq!(query["structuredQuery"]["from"][0]["collectionId"], "meals");
    }

    #[test]
    fn test_records_from_query_skips_read_time_rows() {
        let rows = vec![
            json!({ "document": {
                "name": "projects/p/databases/(default)/documents/users/u1/meals/a",
                "fields": {
                    "timestamp": { "integerValue": "2" },
                    "analysis": { "mapValue": { "fields": {
                        "calories": { "integerValue": "1" },
                        "protein": { "integerValue": "1" },
                        "carbs": { "integerValue": "1" },
                        "fat": { "integerValue": "1" }
                    }}}
                }
            }, "readTime": "2025-01-01T00:00:00Z" }),
            json!({ "readTime": "2025-01-01T00:00:00Z" }),
        ];

        let records = records_from_query(&rows).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "a");
    }

    #[test]
    fn test_empty_collection() {
        let rows = vec![json!({ "readTime": "2025-01-01T00:00:00Z" })];
        assert!(records_from_query(&rows).unwrap().is_empty());
    }
}
