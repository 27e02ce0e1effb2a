use chrono::Local;
use clap::Args;
use std::path::PathBuf;

use nutrilog_core::{backup_file_name, export_backup, parse_backup, Route};

use super::confirm;
use crate::app::App;

#[derive(Args)]
pub struct ExportCommand {
    /// Output file, defaults to nutrilog-backup-YYYY-MM-DD.json in the current directory
    path: Option<PathBuf>,
}

impl ExportCommand {
    pub fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let path = self
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(backup_file_name(Local::now().date_naive())));

        let records = app.coordinator.records();
        let json = export_backup(records)?;
        std::fs::write(&path, json)
            .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;

        println!("Exported {} meal(s) to {}", records.len(), path.display());
        Ok(())
    }
}

#[derive(Args)]
pub struct ImportCommand {
    /// Backup file to merge
    path: PathBuf,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,
}

impl ImportCommand {
    pub async fn run(&self, app: &mut App) -> Result<(), Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| format!("Failed to read '{}': {}", self.path.display(), e))?;
        let records = parse_backup(&contents)?;

        println!("Found {} meal(s) in backup.", records.len());
        if !self.yes && !confirm("Merge them into your log? Existing meals are kept.")? {
            println!("Cancelled.");
            return Ok(());
        }

        let summary = app.coordinator.import_backup(records).await?;
        let destination = match summary.route {
            Route::Cloud => "the cloud",
            Route::Local => "this device",
        };
        println!(
            "Imported {} new meal(s) to {} ({} already present).",
            summary.added,
            destination,
            summary.found - summary.added
        );
        Ok(())
    }
}

#[derive(Args)]
pub struct ClearCommand {
    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,
}

impl ClearCommand {
    pub fn run(&self, app: &mut App) -> Result<(), Box<dyn std::error::Error>> {
        let count = app.coordinator.local().load().len();
        let prompt = format!(
            "Delete all {} meal(s) stored on this device? Cloud data is not affected.",
            count
        );
        if !self.yes && !confirm(&prompt)? {
            println!("Cancelled.");
            return Ok(());
        }

        app.coordinator.clear_all()?;
        println!("Local meal data cleared.");
        Ok(())
    }
}
