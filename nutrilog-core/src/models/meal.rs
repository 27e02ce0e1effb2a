use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::macro_profile::MacroProfile;

/// The analyzer's estimate for a meal: macros plus a short title and the
/// food items it recognized.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MealAnalysis {
    #[serde(flatten)]
    pub macros: MacroProfile,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub food_items: Vec<String>,
}

impl MealAnalysis {
    pub fn new(macros: MacroProfile, summary: impl Into<String>) -> Self {
        Self {
            macros,
            summary: summary.into(),
            food_items: Vec::new(),
        }
    }

    pub fn with_food_items(mut self, items: Vec<String>) -> Self {
        self.food_items = items;
        self
    }
}

/// One logged meal.
///
/// `id` is generated on creation and never changes afterwards; it is the
/// merge key for backup imports and the document key in the cloud store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MealRecord {
    pub id: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub original_text: String,
    pub analysis: MealAnalysis,
}

impl MealRecord {
    pub fn new(original_text: impl Into<String>, analysis: MealAnalysis) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().timestamp_millis(),
            original_text: original_text.into(),
            analysis,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Timestamp in the given time zone, or `None` if it is out of range.
    pub fn time_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        tz.timestamp_millis_opt(self.timestamp).single()
    }
}

impl fmt::Display for MealRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let when = self
            .time_in(&Local)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| self.timestamp.to_string());

        writeln!(f, "{} ({})", self.analysis.summary, when)?;
        writeln!(f, "{}", "=".repeat(30))?;
        writeln!(f, "{}", self.analysis.macros)?;

        if !self.analysis.food_items.is_empty() {
            writeln!(f, "Items:")?;
            for item in &self.analysis.food_items {
                writeln!(f, "  - {}", item)?;
            }
        }

        if !self.original_text.is_empty() {
            writeln!(f, "\nLogged as: {}", self.original_text)?;
        }

        write!(f, "ID: {}", self.id)
    }
}

/// Inserts `record`, replacing any record with the same id in place, then
/// re-sorts newest first.
pub fn upsert_sorted(records: &mut Vec<MealRecord>, record: MealRecord) {
    match records.iter_mut().find(|r| r.id == record.id) {
        Some(existing) => *existing = record,
        None => records.insert(0, record),
    }
    sort_newest_first(records);
}

/// Stable sort by timestamp, newest first.
pub fn sort_newest_first(records: &mut [MealRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
