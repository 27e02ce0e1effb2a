//! Backup files: a JSON array of meal records.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::MealRecord;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Failed to parse backup file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid backup file format: {0}")]
    InvalidFormat(String),
}

/// Parses and checks a backup.
///
/// The content must be a non-empty JSON array whose first element has an
/// `analysis` field, and every element must be a meal record. Nothing is
/// returned unless the whole file passes.
pub fn parse_backup(contents: &str) -> Result<Vec<MealRecord>, BackupError> {
    let value: serde_json::Value = serde_json::from_str(contents)?;

    let items = value
        .as_array()
        .ok_or_else(|| BackupError::InvalidFormat("expected a JSON array".to_string()))?;
    let first = items
        .first()
        .ok_or_else(|| BackupError::InvalidFormat("backup contains no meals".to_string()))?;
    if first.get("analysis").is_none() {
        return Err(BackupError::InvalidFormat(
            "first entry has no `analysis` field".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| BackupError::InvalidFormat(e.to_string()))
}

/// Pretty-printed JSON for a backup file.
pub fn export_backup(records: &[MealRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

pub fn backup_file_name(date: NaiveDate) -> String {
    format!("nutrilog-backup-{}.json", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MacroProfile, MealAnalysis};

    #[test]
    fn test_export_then_parse() {
        let records = vec![
            MealRecord::new(
                "rice",
                MealAnalysis::new(MacroProfile::new(300.0, 6.0, 65.0, 1.0, 1.0), "Rice"),
            )
            .with_id("a")
            .with_timestamp(2),
            MealRecord::new("", MealAnalysis::default())
                .with_id("b")
                .with_timestamp(1),
        ];

        let json = export_backup(&records).unwrap();
        assert!(json.contains('\n'));
        assert_eq!(parse_backup(&json).unwrap(), records);
    }

    #[test]
    fn test_reject_non_array() {
        let err = parse_backup(r#"{"id": "a"}"#).unwrap_err();
        assert!(matches!(err, BackupError::InvalidFormat(_)));
    }

    #[test]
    fn test_reject_empty_array() {
        assert!(matches!(
            parse_backup("[]"),
            Err(BackupError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_reject_first_without_analysis() {
        let json = r#"[{"id": "a", "timestamp": 1, "originalText": "x"}]"#;
        let err = parse_backup(json).unwrap_err();
        assert!(err.to_string().contains("analysis"));
    }

    #[test]
    fn test_reject_bad_later_entry() {
        let json = r#"[
            {"id": "a", "timestamp": 1, "analysis": {"calories": 1, "protein": 1, "carbs": 1, "fat": 1}},
            {"id": "b"}
        ]"#;
        assert!(matches!(
            parse_backup(json),
            Err(BackupError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_reject_unparsable() {
        assert!(matches!(
            parse_backup("not json"),
            Err(BackupError::Parse(_))
        ));
    }

    #[test]
    fn test_legacy_backup_without_fiber() {
        let json = r#"[{"id": "a", "timestamp": 1, "originalText": "tea",
            "analysis": {"calories": 5, "protein": 0, "carbs": 1, "fat": 0,
                         "summary": "Tea", "foodItems": []}}]"#;
        let records = parse_backup(json).unwrap();
        assert_eq!(records[0].analysis.macros.fiber, 0.0);
    }

    #[test]
    fn test_backup_file_name() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(backup_file_name(date), "nutrilog-backup-2025-03-07.json");
    }
}
