//! Parley CLI — the main entry point.
//!
//! Commands:
//! - `demo`         — Run a scripted live-view session against an in-memory feed
//! - `censor`       — Run the censorship transform over a string
//! - `check-config` — Load, validate, and print the effective configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "parley",
    about = "Parley — terminal chat client over a live document change-feed",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted live-view session against an in-memory feed
    Demo {
        /// Override the viewport height
        #[arg(long)]
        height: Option<i32>,
    },

    /// Run the two-pass censorship transform over a string
    Censor {
        /// The text to censor
        text: String,

        /// Whole-word pass only (skip the obfuscation-resistant pass)
        #[arg(long)]
        simple: bool,
    },

    /// Load, validate, and print the effective configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Demo { height } => commands::demo::run(height).await?,
        Commands::Censor { text, simple } => commands::censor::run(&text, simple)?,
        Commands::CheckConfig => commands::check_config::run()?,
    }

    Ok(())
}
