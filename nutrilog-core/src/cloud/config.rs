//! Cloud connection credentials.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors found by the structural check, before any network attempt.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required field `{0}` in cloud configuration")]
    MissingField(&'static str),

    #[error("Cloud configuration is not a valid JSON object: {0}")]
    Parse(String),
}

/// Connection parameters for the cloud project.
///
/// Field names follow the vendor's web config object so a pasted JSON
/// snippet deserializes directly. Only `apiKey`, `authDomain` and
/// `projectId` are required; whether they actually work is only known once
/// a connection has been attempted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloudConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub auth_domain: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging_sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_id: Option<String>,
}

impl CloudConfig {
    pub fn new(
        api_key: impl Into<String>,
        auth_domain: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            auth_domain: auth_domain.into(),
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    /// Parses a strict JSON object. Anything else (JavaScript snippets,
    /// trailing code) is rejected rather than scraped for an object literal.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let config: CloudConfig =
            serde_json::from_str(input.trim()).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every required identity field is present and non-blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("apiKey", &self.api_key),
            ("authDomain", &self.auth_domain),
            ("projectId", &self.project_id),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(name));
            }
        }
        Ok(())
    }

    /// API key with everything but the first and last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let key = &self.api_key;
        if key.len() > 8 && key.is_ascii() {
            format!("{}...{}", &key[..4], &key[key.len() - 4..])
        } else {
            "****".to_string()
        }
    }
}
