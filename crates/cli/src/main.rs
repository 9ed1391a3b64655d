//! voicecart CLI - voice shopping assistant pipeline
//!
//! This binary runs typed queries through the agent pipeline and prints the
//! answer, or the whole request record for inspection.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use voicecart::{build_pipeline, render_answer, render_json};
use voicecart_core::Config;

#[derive(Parser)]
#[command(name = "voicecart")]
#[command(about = "Grounded product search over a private catalog and the open web")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one query through the pipeline
    Ask {
        /// The shopper's query
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Print the full request record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Some(Commands::Ask { query, json }) => {
            ask(&query.join(" "), json, cli.config.as_deref()).await
        }
        Some(Commands::Config) => show_config(cli.config.as_deref()),
        None => {
            println!("Run 'voicecart ask <QUERY>' to search, or --help for more options");
            Ok(())
        }
    }
}

/// Initialize logging system
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "voicecart={level},voicecart_agents={level},voicecart_llm={level},voicecart_tools={level},voicecart_core={level}"
        ))
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    debug!("Effective configuration: {config:?}");
    Ok(config)
}

async fn ask(query: &str, json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    info!(
        provider = %config.llm.provider,
        model = %config.llm.model,
        tools = %config.tools.base_url,
        "Starting pipeline"
    );

    let pipeline = build_pipeline(&config)?;
    let record = pipeline.run(query).await;

    if json {
        println!("{}", render_json(&record)?);
    } else {
        println!("{}", render_answer(&record));
    }
    Ok(())
}

fn show_config(config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if config.llm.api_key.is_some() {
        config.llm.api_key = Some("***REDACTED***".to_string());
    }
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("{rendered}");
    Ok(())
}
