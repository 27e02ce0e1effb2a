//! Firebase implementations of the cloud capability traits, over REST.

mod firestore;
mod identity;
mod value;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use nutrilog_core::{CloudConfig, CloudConnector, CloudError, CloudHandle};

pub use firestore::FirestoreStore;
pub use identity::FirebaseIdentity;

const IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";
const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

/// Connects to a Firebase project.
///
/// The probe asks Identity Toolkit for the project behind the API key, so a
/// bad key or a key from another project fails here rather than on first
/// use.
pub struct FirebaseConnector {
    client: reqwest::Client,
    data_dir: PathBuf,
}

impl FirebaseConnector {
    pub fn new(client: reqwest::Client, data_dir: PathBuf) -> Self {
        Self { client, data_dir }
    }

    fn token_path(&self, project_id: &str) -> PathBuf {
        self.data_dir
            .join(format!("firebase-session-{}.json", sanitize(project_id)))
    }

    async fn probe(&self, config: &CloudConfig) -> Result<(), CloudError> {
        let url = format!(
            "{}/projects?key={}",
            IDENTITY_URL,
            urlencoding::encode(&config.api_key)
        );
        tracing::debug!("GET {}/projects", IDENTITY_URL);

        let response = self.client.get(url).send().await.map_err(network_error)?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| CloudError::InvalidResponse(e.to_string()))?;

        check_project(config, &body)
    }
}

#[async_trait]
impl CloudConnector for FirebaseConnector {
    async fn connect(&self, config: &CloudConfig) -> Result<CloudHandle, CloudError> {
        self.probe(config).await?;
        tracing::info!("Connected to Firebase project {}", config.project_id);

        let identity = FirebaseIdentity::new(
            self.client.clone(),
            config.api_key.clone(),
            self.token_path(&config.project_id),
        );
        identity.restore().await;

        Ok(CloudHandle {
            documents: Arc::new(FirestoreStore::new(
                self.client.clone(),
                config.project_id.clone(),
            )),
            identity: Arc::new(identity),
        })
    }
}

fn check_project(config: &CloudConfig, body: &Value) -> Result<(), CloudError> {
    let project_id = body["projectId"]
        .as_str()
        .ok_or_else(|| CloudError::InvalidResponse("project lookup returned no projectId".into()))?;
    if project_id != config.project_id {
        return Err(CloudError::Rejected {
            status: StatusCode::BAD_REQUEST.as_u16(),
            message: format!(
                "API key belongs to project '{}', not '{}'",
                project_id, config.project_id
            ),
        });
    }

    let localhost_allowed = body["authorizedDomains"]
        .as_array()
        .map(|domains| domains.iter().any(|d| d == "localhost"))
        .unwrap_or(true);
    if !localhost_allowed {
        tracing::warn!("'localhost' is not an authorized domain; Google sign-in will be refused");
    }
    Ok(())
}

/// `error.message` from a Google API error body.
fn error_message(body: &Value) -> String {
    body["error"]["message"]
        .as_str()
        .or_else(|| body["error"].as_str())
        .unwrap_or("Unknown error")
        .to_string()
}

fn network_error(e: reqwest::Error) -> CloudError {
    CloudError::Network(e.to_string())
}

async fn api_error(response: reqwest::Response) -> CloudError {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    classify_status(status, error_message(&body))
}

fn classify_status(status: StatusCode, message: String) -> CloudError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CloudError::PermissionDenied(message),
        _ => CloudError::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

fn sanitize(project_id: &str) -> String {
    project_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
