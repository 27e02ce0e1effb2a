mod cloud;
mod config_cmd;
mod data;
mod meal;
mod model;
mod summary;

pub use cloud::CloudCommand;
pub use config_cmd::ConfigCommand;
pub use data::{ClearCommand, ExportCommand, ImportCommand};
pub use meal::{DeleteCommand, EditCommand, HistoryCommand, LogCommand};
pub use model::ModelCommand;
pub use summary::SummaryCommand;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use clap::ValueEnum;
use std::io::{self, BufRead, Write};
use std::path::Path;

use nutrilog_core::{MealImage, Route};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Asks a yes/no question on stdin. Anything but `y`/`yes` is a no.
pub fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Parses `YYYY-MM-DD HH:MM` or `HH:MM` (today) in local time into epoch
/// milliseconds.
pub fn parse_local_time(input: &str) -> Result<i64, String> {
    let input = input.trim();
    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M")
        .or_else(|_| {
            NaiveTime::parse_from_str(input, "%H:%M")
                .map(|t| Local::now().date_naive().and_time(t))
        })
        .or_else(|_| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .map(|d| d.and_time(NaiveTime::default()))
        })
        .map_err(|_| {
            format!(
                "Invalid time '{}'. Use 'YYYY-MM-DD HH:MM', 'YYYY-MM-DD' or 'HH:MM'.",
                input
            )
        })?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.timestamp_millis())
        .ok_or_else(|| format!("Time '{}' does not exist in the local time zone", input))
}

pub fn read_image(path: &Path) -> Result<MealImage, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("Failed to read image '{}': {}", path.display(), e))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    Ok(MealImage::new(bytes, MealImage::mime_for_extension(ext)))
}

/// Tells the user where a write went.
pub fn print_route(route: Route) {
    match route {
        Route::Cloud => println!("(saved to cloud)"),
        Route::Local => println!("(saved on this device)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
    }

    #[test]
    fn test_parse_local_time_full() {
        let millis = parse_local_time("2025-01-16 12:30").unwrap();
        let time = Local.timestamp_millis_opt(millis).unwrap();
        assert_eq!(time.day(), 16);
        assert_eq!(time.hour(), 12);
        assert_eq!(time.minute(), 30);
    }

    #[test]
    fn test_parse_local_time_today() {
        let millis = parse_local_time("07:05").unwrap();
        let time = Local.timestamp_millis_opt(millis).unwrap();
        assert_eq!(time.hour(), 7);
        assert_eq!(time.minute(), 5);
    }

    #[test]
    fn test_parse_local_time_invalid() {
        assert!(parse_local_time("yesterday").is_err());
    }

    #[test]
    fn test_read_image_guesses_mime() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("plate.PNG");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let image = read_image(&path).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.bytes, vec![1, 2, 3]);
    }
}
