//! Bible assistant CLI entry point.

use anyhow::Result;
use bible_assistant::cli::{commands, Cli, Commands};
use bible_assistant::config::Settings;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets may live in a local .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let config_path = match &cli.config {
        Some(path) => Settings::expand_path(path),
        None => Settings::default_config_path(),
    };
    let settings = Settings::load_from(Some(&config_path))?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            format!("bible_assistant={}", log_level)
        })))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match &cli.command {
        Commands::Init => {
            commands::run_init(&config_path, &settings)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&config_path, &settings).await?;
        }

        Commands::Chat => {
            commands::run_chat(settings).await?;
        }

        Commands::Ask {
            question,
            show_query,
            no_sources,
        } => {
            commands::run_ask(question, *show_query, *no_sources, settings).await?;
        }

        Commands::Search { query, limit } => {
            commands::run_search(query, *limit, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, *port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &config_path, settings)?;
        }
    }

    Ok(())
}
