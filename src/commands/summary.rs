use chrono::Local;
use clap::Args;
use serde::Serialize;

use nutrilog_core::summary::{chart, records_in_range, totals};
use nutrilog_core::{ChartPoint, MacroProfile, TimeRange, DAILY_TARGETS};

use super::OutputFormat;
use crate::app::App;

const BAR_WIDTH: f64 = 30.0;

#[derive(Args)]
pub struct SummaryCommand {
    /// Time range: day, week or month
    #[arg(long, short, default_value = "day")]
    range: TimeRange,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Serialize)]
struct SummaryJson {
    range: String,
    meals: usize,
    totals: MacroProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    targets: Option<MacroProfile>,
    chart: Vec<ChartJson>,
}

#[derive(Serialize)]
struct ChartJson {
    label: String,
    #[serde(flatten)]
    macros: MacroProfile,
}

impl SummaryCommand {
    pub fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let now = Local::now();
        let in_range = records_in_range(app.coordinator.records(), self.range, &now);
        let sum = totals(in_range.iter().copied());
        let points = chart(self.range, &in_range, &now);
        let targets = (self.range == TimeRange::Day).then_some(DAILY_TARGETS);

        match self.format {
            OutputFormat::Json => {
                let json = SummaryJson {
                    range: self.range.to_string(),
                    meals: in_range.len(),
                    totals: sum,
                    targets,
                    chart: points
                        .into_iter()
                        .map(|p| ChartJson {
                            label: p.label,
                            macros: p.macros,
                        })
                        .collect(),
                };
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Text => {
                let title = match self.range {
                    TimeRange::Day => "Today",
                    TimeRange::Week => "This week",
                    TimeRange::Month => "This month",
                };
                let plural = if in_range.len() == 1 { "" } else { "s" };
                println!("{} ({} meal{})", title, in_range.len(), plural);
                println!("{}", "=".repeat(40));
                print_totals(&sum, targets.as_ref());
                println!();
                print_chart(&points);
            }
        }
        Ok(())
    }
}

fn print_totals(sum: &MacroProfile, targets: Option<&MacroProfile>) {
    let rows = [
        ("Calories", sum.calories, "kcal", targets.map(|t| t.calories)),
        ("Protein", sum.protein, "g", targets.map(|t| t.protein)),
        ("Carbs", sum.carbs, "g", targets.map(|t| t.carbs)),
        ("Fat", sum.fat, "g", targets.map(|t| t.fat)),
        ("Fiber", sum.fiber, "g", targets.map(|t| t.fiber)),
    ];
    for (name, value, unit, target) in rows {
        match target {
            Some(target) if target > 0.0 => println!(
                "{:<9} {:>7.1} {:<4} of {:.0} ({:.0}%)",
                name,
                value,
                unit,
                target,
                value / target * 100.0
            ),
            _ => println!("{:<9} {:>7.1} {}", name, value, unit),
        }
    }
}

fn print_chart(points: &[ChartPoint]) {
    if points.is_empty() {
        println!("No meals in this range.");
        return;
    }
    let max = points
        .iter()
        .map(|p| p.macros.calories)
        .fold(0.0_f64, f64::max);
    for point in points {
        let width = if max > 0.0 {
            (point.macros.calories / max * BAR_WIDTH).round() as usize
        } else {
            0
        };
        println!(
            "{:>5} {:<30} {:.0} kcal",
            point.label,
            "#".repeat(width),
            point.macros.calories
        );
    }
}
