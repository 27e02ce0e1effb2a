//! Wires configuration, storage and the Firebase backend into a coordinator.

use std::sync::Arc;

use nutrilog_core::{
    Coordinator, Lifecycle, LocalStore, MealAnalyzer, ModelPreference, SlotStorage,
};

use crate::config::Config;
use crate::firebase::FirebaseConnector;
use crate::gemini::GeminiAnalyzer;

pub struct App {
    pub coordinator: Coordinator,
    pub models: ModelPreference,
    client: reqwest::Client,
}

impl App {
    /// Opens the data directory and restores the previous cloud state.
    pub async fn open(config: &Config) -> Self {
        let storage = SlotStorage::new(config.data_dir.value.clone());
        let client = reqwest::Client::new();

        let connector = Arc::new(FirebaseConnector::new(
            client.clone(),
            config.data_dir.value.clone(),
        ));
        let lifecycle = Lifecycle::new(storage.clone(), connector);
        let mut coordinator = Coordinator::new(LocalStore::new(storage.clone()), lifecycle);
        let route = coordinator.initialize().await;
        tracing::debug!(
            "Loaded {} meal(s) from {} store",
            coordinator.records().len(),
            route
        );

        Self {
            coordinator,
            models: ModelPreference::new(storage),
            client,
        }
    }

    /// Analyzer for the selected model. Fails if no API key is configured.
    pub fn analyzer(&self, config: &Config) -> Result<impl MealAnalyzer, String> {
        let api_key = config.gemini.api_key.value.clone().ok_or(
            "No Gemini API key configured. Set GEMINI_API_KEY or gemini.api_key in the config file.",
        )?;
        Ok(GeminiAnalyzer::new(
            self.client.clone(),
            config.gemini.endpoint.value.clone(),
            api_key,
            self.models.get(),
        ))
    }

    /// Prints and clears any non-fatal failures collected so far.
    pub fn report_notices(&mut self) {
        for notice in self.coordinator.take_notices() {
            eprintln!("Warning: {}", notice);
        }
    }
}
