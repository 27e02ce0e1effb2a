//! Google sign-in through the Identity Toolkit REST API.
//!
//! Sign-in asks Identity Toolkit for a Google auth URI whose continue URI is
//! a one-shot callback server on localhost, opens it in the browser and
//! exchanges the redirect for Firebase tokens. The refresh token is kept in
//! a per-project file in the data directory so the next run starts signed
//! in.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::RawQuery, response::Html, routing::get, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{oneshot, watch};

use nutrilog_core::{AuthError, AuthSession, IdentityProvider, UserProfile};

use super::{error_message, IDENTITY_URL, SECURE_TOKEN_URL};

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>nutrilog - Signed in</title></head>
<body>
<h1>Sign-in complete</h1>
<p>You can close this window and return to the terminal.</p>
</body>
</html>"#;

/// Stored alongside the meal slots; only the refresh token is secret.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredToken {
    uid: String,
    refresh_token: String,
}

pub struct FirebaseIdentity {
    client: reqwest::Client,
    api_key: String,
    token_path: PathBuf,
    sender: watch::Sender<Option<AuthSession>>,
}

impl FirebaseIdentity {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, token_path: PathBuf) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            client,
            api_key: api_key.into(),
            token_path,
            sender,
        }
    }

    /// Restores the previous session from the stored refresh token, if any.
    ///
    /// Failure leaves the provider signed out; the token file is only
    /// discarded when the server rejects it.
    pub async fn restore(&self) {
        let Some(stored) = self.read_token() else {
            return;
        };
        tracing::debug!("Restoring cloud session for {}", stored.uid);

        match self.refresh(&stored.refresh_token).await {
            Ok(session) => {
                tracing::info!("Restored cloud session for {}", session.uid());
                self.sender.send_replace(Some(session));
            }
            Err(RefreshError::Rejected(message)) => {
                tracing::warn!("Stored sign-in is no longer valid: {}", message);
                self.forget_token();
            }
            Err(RefreshError::Unavailable(message)) => {
                tracing::warn!("Could not restore cloud session: {}", message);
            }
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/accounts:{}?key={}",
            IDENTITY_URL,
            method,
            urlencoding::encode(&self.api_key)
        )
    }

    async fn call(&self, method: &str, body: &Value) -> Result<Value, AuthError> {
        tracing::debug!("POST accounts:{}", method);
        let response = self
            .client
            .post(self.endpoint(method))
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Other(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| AuthError::Other(e.to_string()))?;
        if !status.is_success() {
            return Err(classify(&error_message(&body)));
        }
        Ok(body)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, RefreshError> {
        let url = format!(
            "{}/token?key={}",
            SECURE_TOKEN_URL,
            urlencoding::encode(&self.api_key)
        );
        let response = self
            .client
            .post(url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| RefreshError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| RefreshError::Unavailable(e.to_string()))?;
        if status.is_client_error() {
            return Err(RefreshError::Rejected(error_message(&body)));
        }
        if !status.is_success() {
            return Err(RefreshError::Unavailable(error_message(&body)));
        }

        let id_token = body["id_token"]
            .as_str()
            .ok_or_else(|| RefreshError::Unavailable("no id_token in response".into()))?
            .to_string();
        if let Some(rotated) = body["refresh_token"].as_str() {
            if rotated != refresh_token {
                if let Some(uid) = body["user_id"].as_str() {
                    self.store_token(uid, rotated);
                }
            }
        }

        let lookup = self
            .call("lookup", &json!({ "idToken": id_token }))
            .await
            .map_err(|e| RefreshError::Unavailable(e.to_string()))?;
        let user = profile_from(&lookup["users"][0])
            .ok_or_else(|| RefreshError::Unavailable("account lookup returned no user".into()))?;

        Ok(AuthSession::new(user, id_token))
    }

    fn read_token(&self) -> Option<StoredToken> {
        let contents = std::fs::read_to_string(&self.token_path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(stored) => Some(stored),
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable session file {}: {}",
                    self.token_path.display(),
                    e
                );
                None
            }
        }
    }

    fn store_token(&self, uid: &str, refresh_token: &str) {
        let stored = StoredToken {
            uid: uid.to_string(),
            refresh_token: refresh_token.to_string(),
        };
        let result = serde_json::to_string(&stored)
            .map_err(std::io::Error::other)
            .and_then(|json| {
                if let Some(parent) = self.token_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&self.token_path, json)
            });
        if let Err(e) = result {
            tracing::warn!("Could not save sign-in for next time: {}", e);
        }
    }

    fn forget_token(&self) {
        match std::fs::remove_file(&self.token_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Could not remove session file: {}", e),
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    fn sessions(&self) -> watch::Receiver<Option<AuthSession>> {
        self.sender.subscribe()
    }

    async fn sign_in(&self) -> Result<AuthSession, AuthError> {
        let (tx, rx) = oneshot::channel::<String>();
        let tx = Arc::new(Mutex::new(Some(tx)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| AuthError::Other(format!("could not start callback server: {}", e)))?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::Other(e.to_string()))?
            .port();
        let callback_url = format!("http://localhost:{}/callback", port);

        let server_handle = tokio::spawn(async move {
            let app = Router::new().route(
                "/callback",
                get(move |RawQuery(query): RawQuery| {
                    let tx = tx.clone();
                    async move {
                        let sender = tx.lock().ok().and_then(|mut slot| slot.take());
                        if let Some(sender) = sender {
                            let _ = sender.send(query.unwrap_or_default());
                        }
                        Html(SUCCESS_PAGE)
                    }
                }),
            );
            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!("Callback server stopped: {}", e);
            }
        });

        let result = self.complete_sign_in(&callback_url, rx).await;
        server_handle.abort();

        let (session, refresh_token) = result?;
        if !refresh_token.is_empty() {
            self.store_token(session.uid(), &refresh_token);
        }
        self.sender.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.forget_token();
        self.sender.send_replace(None);
        Ok(())
    }
}

impl FirebaseIdentity {
    async fn complete_sign_in(
        &self,
        callback_url: &str,
        rx: oneshot::Receiver<String>,
    ) -> Result<(AuthSession, String), AuthError> {
        let created = self
            .call(
                "createAuthUri",
                &json!({ "providerId": "google.com", "continueUri": callback_url }),
            )
            .await?;
        let auth_uri = created["authUri"]
            .as_str()
            .ok_or_else(|| AuthError::Other("no authUri in response".into()))?;
        let session_id = created["sessionId"].as_str().unwrap_or_default().to_string();

        println!("Opening your browser to sign in with Google...");
        match open_browser(auth_uri).await {
            Ok(()) => println!("If nothing opens, visit:"),
            Err(e) => {
                tracing::warn!("Could not open a browser: {}", e);
                println!("Could not open a browser. Visit this URL to continue:");
            }
        }
        println!("  {}", auth_uri);

        let query = match tokio::time::timeout(CALLBACK_TIMEOUT, rx).await {
            Ok(Ok(query)) => query,
            _ => return Err(AuthError::Other("timed out waiting for sign-in".into())),
        };

        let signed_in = self
            .call(
                "signInWithIdp",
                &json!({
                    "requestUri": format!("{}?{}", callback_url, query),
                    "sessionId": session_id,
                    "returnSecureToken": true,
                    "returnIdpCredential": true,
                }),
            )
            .await?;

        let user = profile_from(&signed_in)
            .ok_or_else(|| AuthError::Other("sign-in response has no user id".into()))?;
        let id_token = signed_in["idToken"]
            .as_str()
            .ok_or_else(|| AuthError::Other("sign-in response has no idToken".into()))?;
        let refresh_token = signed_in["refreshToken"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Ok((AuthSession::new(user, id_token), refresh_token))
    }
}

enum RefreshError {
    Rejected(String),
    Unavailable(String),
}

/// Maps an Identity Toolkit error code to a sign-in failure class.
fn classify(message: &str) -> AuthError {
    let code = message.split([' ', ':']).next().unwrap_or_default();
    match code {
        "UNAUTHORIZED_DOMAIN" | "INVALID_CONTINUE_URI" => {
            AuthError::UnauthorizedDomain(message.to_string())
        }
        _ => AuthError::Other(message.to_string()),
    }
}

/// Profile from a `signInWithIdp` response or an `accounts:lookup` user.
fn profile_from(value: &Value) -> Option<UserProfile> {
    let uid = value["localId"].as_str().filter(|s| !s.is_empty())?;
    let text = |key: &str| value[key].as_str().map(str::to_string);
    Some(UserProfile {
        uid: uid.to_string(),
        display_name: text("displayName"),
        photo_url: text("photoUrl"),
        email: text("email"),
    })
}

async fn open_browser(url: &str) -> Result<(), AuthError> {
    if cfg!(target_os = "macos") {
        launch("open", &[], url).await
    } else if cfg!(target_os = "windows") {
        launch("cmd", &["/C", "start", ""], url).await
    } else {
        launch("xdg-open", &[], url).await
    }
}

async fn launch(program: &str, args: &[&str], url: &str) -> Result<(), AuthError> {
    let status = tokio::process::Command::new(program)
        .args(args)
        .arg(url)
        .status()
        .await;
    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(AuthError::PopupBlocked(format!(
            "{} exited with {}",
            program, status
        ))),
        Err(e) => Err(AuthError::PopupBlocked(format!("{}: {}", program, e))),
    }
}
