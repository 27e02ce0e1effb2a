use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod commands;
mod config;
mod firebase;
mod gemini;

use app::App;
use commands::{
    ClearCommand, CloudCommand, ConfigCommand, DeleteCommand, EditCommand, ExportCommand,
    HistoryCommand, ImportCommand, LogCommand, ModelCommand, SummaryCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "nutrilog")]
#[command(version)]
#[command(about = "Log meals and track macros with AI estimates", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe a meal and log its estimated macros
    Log(LogCommand),

    /// Change a logged meal
    Edit(EditCommand),

    /// Delete a logged meal
    Delete(DeleteCommand),

    /// Meals grouped by day
    History(HistoryCommand),

    /// Totals and trend for today, this week or this month
    Summary(SummaryCommand),

    /// Write all meals to a backup file
    Export(ExportCommand),

    /// Merge meals from a backup file
    Import(ImportCommand),

    /// Delete all meals stored on this device
    Clear(ClearCommand),

    /// Store meals in your own Firebase project
    Cloud(CloudCommand),

    /// Choose the analysis model
    Model(ModelCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nutrilog=warn,nutrilog_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let cli_config_path = cli.config.clone();
    let config = Config::load(cli.config)?;

    let Some(command) = &cli.command else {
        println!("Use --help to see available commands");
        return Ok(());
    };

    // Config commands never touch the data directory.
    if let Commands::Config(cmd) = command {
        return cmd.run(&config, cli_config_path);
    }

    let mut app = App::open(&config).await;
    app.report_notices();

    let result = execute_command(command, &mut app, &config).await;
    app.report_notices();
    result
}

async fn execute_command(
    command: &Commands,
    app: &mut App,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Log(cmd) => cmd.run(app, config).await,
        Commands::Edit(cmd) => cmd.run(app, config).await,
        Commands::Delete(cmd) => cmd.run(app).await,
        Commands::History(cmd) => cmd.run(app),
        Commands::Summary(cmd) => cmd.run(app),
        Commands::Export(cmd) => cmd.run(app),
        Commands::Import(cmd) => cmd.run(app).await,
        Commands::Clear(cmd) => cmd.run(app),
        Commands::Cloud(cmd) => cmd.run(app).await,
        Commands::Model(cmd) => cmd.run(app),
        Commands::Config(cmd) => cmd.run(config, None),
    }
}
