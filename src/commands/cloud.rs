use clap::{Args, Subcommand};
use std::path::PathBuf;

use nutrilog_core::{CloudConfig, LifecycleState};

use super::confirm;
use crate::app::App;

#[derive(Args)]
pub struct CloudCommand {
    #[command(subcommand)]
    pub command: CloudSubcommand,
}

#[derive(Subcommand)]
pub enum CloudSubcommand {
    /// Connect a Firebase project (paste its web config JSON or pass the fields)
    Connect {
        /// Firebase config object as JSON
        #[arg(long, conflicts_with_all = ["file", "api_key"])]
        json: Option<String>,

        /// File containing the Firebase config JSON
        #[arg(long, conflicts_with = "api_key")]
        file: Option<PathBuf>,

        /// Web API key
        #[arg(long, requires_all = ["auth_domain", "project_id"])]
        api_key: Option<String>,

        /// Auth domain, e.g. my-project.firebaseapp.com
        #[arg(long)]
        auth_domain: Option<String>,

        /// Project ID
        #[arg(long)]
        project_id: Option<String>,
    },

    /// Forget the Firebase project and go back to local storage
    Disconnect {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Sign in with Google
    Login,

    /// Sign out
    Logout,

    /// Show connection and sign-in state
    Status,

    /// Reload all meals from the cloud
    Sync,
}

impl CloudCommand {
    pub async fn run(&self, app: &mut App) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            CloudSubcommand::Connect {
                json,
                file,
                api_key,
                auth_domain,
                project_id,
            } => {
                let config = if let Some(json) = json {
                    CloudConfig::from_json(json)?
                } else if let Some(path) = file {
                    let contents = std::fs::read_to_string(path)
                        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
                    CloudConfig::from_json(&contents)?
                } else if let Some(key) = api_key {
                    CloudConfig::new(
                        key.as_str(),
                        auth_domain.clone().unwrap_or_default(),
                        project_id.clone().unwrap_or_default(),
                    )
                } else {
                    return Err(
                        "Provide --json, --file or --api-key/--auth-domain/--project-id".into(),
                    );
                };

                println!("Connecting to project {}...", config.project_id);
                app.coordinator.submit_config(config).await?;
                println!("Connected.");
                let state = app.coordinator.lifecycle().state();
                print_state(&state);
                if state.session().is_none() {
                    println!("Run 'nutrilog cloud login' to sign in and store meals in the cloud.");
                }
            }

            CloudSubcommand::Disconnect { yes } => {
                if !app.coordinator.lifecycle().state().is_configured() {
                    println!("Cloud sync is not configured.");
                    return Ok(());
                }
                let prompt = "Remove the cloud configuration? Meals already in the cloud stay there; \
                              this device goes back to local storage.";
                if !yes && !confirm(prompt)? {
                    println!("Cancelled.");
                    return Ok(());
                }
                app.coordinator.disconnect().await?;
                println!("Cloud configuration removed. Using local storage.");
            }

            CloudSubcommand::Login => {
                let session = app.coordinator.sign_in().await?;
                println!("Signed in as {}", session.user.label());
                println!(
                    "{} meal(s) in your cloud log.",
                    app.coordinator.records().len()
                );
            }

            CloudSubcommand::Logout => {
                app.coordinator.sign_out().await?;
                println!("Signed out. Using local storage.");
            }

            CloudSubcommand::Status => {
                let state = app.coordinator.lifecycle().state();
                print_state(&state);
                if let Some(config) = app.coordinator.lifecycle().config() {
                    println!("Project:  {}", config.project_id);
                    println!("Domain:   {}", config.auth_domain);
                    println!("API key:  {}", config.masked_api_key());
                }
                println!("Storage:  {}", app.coordinator.route());
                println!("Meals:    {}", app.coordinator.records().len());
            }

            CloudSubcommand::Sync => {
                let count = app.coordinator.resync().await?;
                println!("Loaded {} meal(s) from the cloud.", count);
            }
        }
        Ok(())
    }
}

fn print_state(state: &LifecycleState) {
    println!("Status:   {}", state);
    if let Some(session) = state.session() {
        let user = &session.user;
        println!("User:     {}", user.label());
        if let Some(email) = &user.email {
            if user.display_name.is_some() {
                println!("Email:    {}", email);
            }
        }
    }
}
