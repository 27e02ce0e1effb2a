use clap::{Args, Subcommand};

use nutrilog_core::local::{DEFAULT_MODEL, KNOWN_MODELS};

use crate::app::App;

#[derive(Args)]
pub struct ModelCommand {
    #[command(subcommand)]
    pub command: ModelSubcommand,
}

#[derive(Subcommand)]
pub enum ModelSubcommand {
    /// Show the model used for meal analysis
    Show,

    /// Select the model used for meal analysis
    Set {
        /// Model identifier, e.g. gemini-2.5-pro
        model: String,
    },

    /// List suggested models
    List,

    /// Go back to the default model
    Reset,
}

impl ModelCommand {
    pub fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ModelSubcommand::Show => {
                println!("{}", app.models.get());
            }
            ModelSubcommand::Set { model } => {
                if model.trim().is_empty() {
                    return Err("Model identifier cannot be empty".into());
                }
                app.models.set(model)?;
                if !KNOWN_MODELS.contains(&model.trim()) {
                    println!("Note: '{}' is not in the suggested list.", model.trim());
                }
                println!("Analysis model set to {}", model.trim());
            }
            ModelSubcommand::List => {
                let current = app.models.get();
                for model in KNOWN_MODELS {
                    let marker = if *model == current { "*" } else { " " };
                    let default = if *model == DEFAULT_MODEL {
                        " (default)"
                    } else {
                        ""
                    };
                    println!("{} {}{}", marker, model, default);
                }
            }
            ModelSubcommand::Reset => {
                app.models.reset()?;
                println!("Analysis model reset to {}", DEFAULT_MODEL);
            }
        }
        Ok(())
    }
}
