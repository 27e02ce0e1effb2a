//! Dashboard aggregates: range totals, chart buckets and day grouping.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};
use std::fmt;
use std::str::FromStr;

use crate::models::{MacroProfile, MealRecord};

/// Daily reference intake for an average adult (UK guidance).
pub const DAILY_TARGETS: MacroProfile = MacroProfile {
    calories: 2500.0,
    protein: 55.0,
    carbs: 310.0,
    fat: 95.0,
    fiber: 30.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    #[default]
    Day,
    Week,
    Month,
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeRange::Day => write!(f, "day"),
            TimeRange::Week => write!(f, "week"),
            TimeRange::Month => write!(f, "month"),
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "today" => Ok(TimeRange::Day),
            "week" => Ok(TimeRange::Week),
            "month" => Ok(TimeRange::Month),
            _ => Err(format!(
                "Invalid time range '{}'. Valid options: day, week, month",
                s
            )),
        }
    }
}

/// One bar of the trend chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub macros: MacroProfile,
}

impl ChartPoint {
    fn empty(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            macros: MacroProfile::default(),
        }
    }
}

fn midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

/// Start of the range containing `now`: today at midnight, Monday of this
/// week, or the 1st of this month.
pub fn range_start<Tz: TimeZone>(range: TimeRange, now: &DateTime<Tz>) -> DateTime<Tz> {
    let today = now.date_naive();
    let first_day = match range {
        TimeRange::Day => today,
        TimeRange::Week => {
            today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
        }
        TimeRange::Month => today.with_day(1).unwrap_or(today),
    };
    midnight(&now.timezone(), first_day)
}

/// Records strictly after the start of the range, in their original order.
pub fn records_in_range<'a, Tz: TimeZone>(
    records: &'a [MealRecord],
    range: TimeRange,
    now: &DateTime<Tz>,
) -> Vec<&'a MealRecord> {
    let start = range_start(range, now).timestamp_millis();
    records.iter().filter(|r| r.timestamp > start).collect()
}

pub fn totals<'a, I>(records: I) -> MacroProfile
where
    I: IntoIterator<Item = &'a MealRecord>,
{
    records
        .into_iter()
        .fold(MacroProfile::default(), |acc, r| acc + r.analysis.macros)
}

/// Chart data for records already filtered to `range`.
///
/// - day: one point per meal labelled `HH:MM`, oldest first
/// - week: `Mon`..`Sun`; records outside the current week are skipped
/// - month: `1`..today's day of month
pub fn chart<Tz: TimeZone>(
    range: TimeRange,
    records: &[&MealRecord],
    now: &DateTime<Tz>,
) -> Vec<ChartPoint>
where
    Tz::Offset: fmt::Display,
{
    let tz = now.timezone();
    match range {
        TimeRange::Day => records
            .iter()
            .rev()
            .filter_map(|r| {
                let time = r.time_in(&tz)?;
                Some(ChartPoint {
                    label: time.format("%H:%M").to_string(),
                    macros: r.analysis.macros,
                })
            })
            .collect(),
        TimeRange::Week => {
            let start = range_start(range, now).date_naive();
            let mut points: Vec<ChartPoint> = (0..7)
                .map(|i| ChartPoint::empty((start + Duration::days(i)).format("%a").to_string()))
                .collect();
            for record in records {
                let Some(time) = record.time_in(&tz) else {
                    continue;
                };
                let offset = (time.date_naive() - start).num_days();
                if let Some(point) = usize::try_from(offset).ok().and_then(|i| points.get_mut(i)) {
                    point.macros += record.analysis.macros;
                }
            }
            points
        }
        TimeRange::Month => {
            let mut points: Vec<ChartPoint> = (1..=now.day())
                .map(|d| ChartPoint::empty(d.to_string()))
                .collect();
            for record in records {
                if let Some(point) = record
                    .time_in(&tz)
                    .and_then(|t| points.get_mut(t.day() as usize - 1))
                {
                    point.macros += record.analysis.macros;
                }
            }
            points
        }
    }
}

/// Groups newest-first records by calendar day, newest day first.
pub fn group_by_day<'a, Tz: TimeZone>(
    records: &'a [MealRecord],
    tz: &Tz,
) -> Vec<(NaiveDate, Vec<&'a MealRecord>)> {
    let mut groups: Vec<(NaiveDate, Vec<&MealRecord>)> = Vec::new();
    for record in records {
        let Some(date) = record.time_in(tz).map(|t| t.date_naive()) else {
            continue;
        };
        match groups.iter_mut().find(|(d, _)| *d == date) {
            Some((_, day)) => day.push(record),
            None => groups.push((date, vec![record])),
        }
    }
    groups
}
