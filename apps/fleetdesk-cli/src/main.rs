mod commands;
mod config;
mod demo;
mod logging;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{Console, Credentials, Listing};
use crate::config::AppConfig;

/// Fleetdesk - clients, licenses and equipment from the command line
#[derive(Parser)]
#[command(name = "fleetdesk")]
#[command(about = "Fleetdesk - clients, licenses and equipment from the command line")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use the in-memory backend seeded with demo data
    #[arg(long)]
    mock: bool,

    #[command(flatten)]
    credentials: Credentials,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration and exit (default)
    Check,
    /// Sign in and print the profile and its capabilities
    Whoami,
    /// Clients visible to the caller
    #[command(subcommand)]
    Clients(Listing),
    /// Licenses visible to the caller
    #[command(subcommand)]
    Licenses(Listing),
    /// Equipment visible to the caller
    #[command(subcommand)]
    Equipment(Listing),
    /// Client, license and equipment summary
    Dashboard,
    /// Send a password reset email
    ResetPassword {
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Layered config:
    // 1) defaults -> 2) YAML (if provided) -> 3) env (FLEETDESK__*) -> 4) CLI overrides
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(cli.verbose);

    let _log_guard = logging::init(&config.logging)?;
    tracing::debug!(config = ?cli.config, mock = cli.mock, "configuration loaded");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    // Building the console validates the backend URL and TLS setup without
    // touching the network.
    let console = Console::connect(&config, cli.mock)?;
    match cli.command.as_ref().unwrap_or(&Commands::Check) {
        Commands::Check => check_config(&config),
        Commands::Whoami => console.whoami(&cli.credentials).await,
        Commands::ResetPassword { email } => console.reset_password(email).await,
        Commands::Clients(listing) => {
            let ctx = console.sign_in(&cli.credentials).await?;
            console.clients(&ctx, listing).await
        }
        Commands::Licenses(listing) => {
            let ctx = console.sign_in(&cli.credentials).await?;
            console.licenses(&ctx, listing).await
        }
        Commands::Equipment(listing) => {
            let ctx = console.sign_in(&cli.credentials).await?;
            console.equipment(&ctx, listing).await
        }
        Commands::Dashboard => {
            let ctx = console.sign_in(&cli.credentials).await?;
            console.dashboard(&ctx).await
        }
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}
