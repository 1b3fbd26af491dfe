use clap::{Parser, Subcommand};
use std::path::PathBuf;

use muster_core::PlannerApi;
use muster_uplink::{ConsoleConfig, HttpPlanner};

mod repl;

/// Muster - Operator console for a mixed civilian drone fleet
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to a TOML config file (default: ~/.muster/config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Backend origin override
    #[arg(long, value_name = "URL")]
    backend_url: Option<String>,

    /// Push feed override
    #[arg(long, value_name = "URL")]
    feed_url: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive operator console
    Console,

    /// Probe backend health once and exit
    Status {
        /// Output in JSON format for integrations
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<ConsoleConfig> {
    let mut config = match &cli.config {
        Some(path) => ConsoleConfig::from_file(path)?,
        None => ConsoleConfig::load_or_default()?,
    }
    .apply_env();
    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(url) = &cli.feed_url {
        config.feed_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run_status(config: ConsoleConfig, json: bool) -> anyhow::Result<()> {
    let planner = HttpPlanner::new(&config)?;
    match planner.status().await {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string(&report)?);
            } else {
                println!(
                    "Backend: running={} authenticated={}",
                    report.running, report.authenticated
                );
                if let Some(online) = report.drones_online {
                    println!("Drones online: {}", online);
                }
                if let Some(version) = &report.version {
                    println!("Version: {}", version);
                }
            }
            Ok(())
        }
        Err(err) => {
            if json {
                println!("{}", serde_json::json!({ "error": err.to_string() }));
                Ok(())
            } else {
                Err(err.into())
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;

    match cli.command.unwrap_or(Commands::Console) {
        Commands::Console => repl::run(config).await,
        Commands::Status { json } => run_status(config, json).await,
    }
}
