use chrono::{Local, NaiveDate};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use nutrilog_core::summary::{group_by_day, totals};
use nutrilog_core::{MacroProfile, MealAnalyzer, MealRecord};

use super::{confirm, parse_local_time, print_route, read_image, OutputFormat};
use crate::app::App;
use crate::config::Config;

#[derive(Args)]
pub struct LogCommand {
    /// What you ate, e.g. "800kcal turkey dinner" or "2 eggs and toast"
    text: Vec<String>,

    /// Photo of the meal
    #[arg(long, short)]
    image: Option<PathBuf>,

    /// When you ate (YYYY-MM-DD HH:MM, YYYY-MM-DD or HH:MM), defaults to now
    #[arg(long)]
    at: Option<String>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl LogCommand {
    pub async fn run(
        &self,
        app: &mut App,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let text = self.text.join(" ");
        let image = self.image.as_deref().map(read_image).transpose()?;
        let timestamp = self.at.as_deref().map(parse_local_time).transpose()?;

        let analyzer = app.analyzer(config)?;
        eprintln!("Analyzing meal...");
        let analysis = analyzer.analyze(&text, image.as_ref()).await?;

        let mut record = MealRecord::new(text, analysis);
        if let Some(ts) = timestamp {
            record = record.with_timestamp(ts);
        }
        let route = app.coordinator.save(record.clone()).await;

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
            OutputFormat::Text => {
                println!("Logged meal:");
                println!();
                println!("{}", record);
                print_route(route);
            }
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct EditCommand {
    /// Meal ID
    id: String,

    /// New description; the meal is analyzed again
    #[arg(long)]
    text: Option<String>,

    /// New photo; the meal is analyzed again
    #[arg(long, short)]
    image: Option<PathBuf>,

    /// New time (YYYY-MM-DD HH:MM, YYYY-MM-DD or HH:MM)
    #[arg(long)]
    at: Option<String>,
}

impl EditCommand {
    pub async fn run(
        &self,
        app: &mut App,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut record = app
            .coordinator
            .find(&self.id)
            .cloned()
            .ok_or_else(|| format!("Meal not found: {}", self.id))?;

        if self.text.is_none() && self.image.is_none() && self.at.is_none() {
            return Err("Nothing to change. Use --text, --image or --at.".into());
        }

        if let Some(at) = &self.at {
            record = record.with_timestamp(parse_local_time(at)?);
        }

        if self.text.is_some() || self.image.is_some() {
            let text = self
                .text
                .clone()
                .unwrap_or_else(|| record.original_text.clone());
            let image = self.image.as_deref().map(read_image).transpose()?;

            let analyzer = app.analyzer(config)?;
            eprintln!("Analyzing meal...");
            record.analysis = analyzer.analyze(&text, image.as_ref()).await?;
            record.original_text = text;
        }

        let route = app.coordinator.save(record.clone()).await;
        println!("Updated meal:");
        println!();
        println!("{}", record);
        print_route(route);
        Ok(())
    }
}

#[derive(Args)]
pub struct DeleteCommand {
    /// Meal ID
    id: String,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,
}

impl DeleteCommand {
    pub async fn run(&self, app: &mut App) -> Result<(), Box<dyn std::error::Error>> {
        let record = app
            .coordinator
            .find(&self.id)
            .ok_or_else(|| format!("Meal not found: {}", self.id))?;

        let prompt = format!(
            "Delete '{}' ({:.0} kcal)?",
            record.analysis.summary, record.analysis.macros.calories
        );
        if !self.yes && !confirm(&prompt)? {
            println!("Cancelled.");
            return Ok(());
        }

        let route = app.coordinator.delete(&self.id).await;
        println!("Deleted meal {} from {} store", self.id, route);
        Ok(())
    }
}

#[derive(Args)]
pub struct HistoryCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,
}

#[derive(Serialize)]
struct DayJson<'a> {
    date: NaiveDate,
    totals: MacroProfile,
    meals: Vec<&'a MealRecord>,
}

impl HistoryCommand {
    pub fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let from = self.from.as_deref().map(parse_date).transpose()?;
        let to = self.to.as_deref().map(parse_date).transpose()?;

        let days: Vec<_> = group_by_day(app.coordinator.records(), &Local)
            .into_iter()
            .filter(|(date, _)| {
                from.map_or(true, |f| *date >= f) && to.map_or(true, |t| *date <= t)
            })
            .collect();

        match self.format {
            OutputFormat::Json => {
                let json: Vec<DayJson> = days
                    .iter()
                    .map(|(date, meals)| DayJson {
                        date: *date,
                        totals: totals(meals.iter().copied()),
                        meals: meals.clone(),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Text => {
                if days.is_empty() {
                    println!("No meals logged yet.");
                    return Ok(());
                }
                for (date, meals) in &days {
                    let day_totals = totals(meals.iter().copied());
                    println!(
                        "{}  ({} meal{}, {:.0} kcal)",
                        date.format("%A, %B %-d %Y"),
                        meals.len(),
                        if meals.len() == 1 { "" } else { "s" },
                        day_totals.calories
                    );
                    for meal in meals {
                        print_history_line(meal);
                    }
                    println!();
                }
            }
        }
        Ok(())
    }
}

fn print_history_line(meal: &MealRecord) {
    let time = meal
        .time_in(&Local)
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string());
    let m = &meal.analysis.macros;
    println!(
        "  {}  {:<28} {:>5.0} kcal  P {:.1}  C {:.1}  F {:.1}  Fi {:.1}  [{}]",
        time, meal.analysis.summary, m.calories, m.protein, m.carbs, m.fat, m.fiber, meal.id
    );
}

fn parse_date(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date format '{}'. Use YYYY-MM-DD.", input))
}
