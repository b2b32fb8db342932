//! PlanD CLI entry point

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info};

use pland::cli::{self, Cli, Command};
use pland::config::Config;
use pland::engine::Engine;
use pland::llm::create_client;
use pland::repo::MemoryRepository;

fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > RUST_LOG > default (INFO)
    let level = match cli_log_level.map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    debug!("Logging initialized (level: {:?})", level);
    Ok(())
}

/// Where the plan snapshot lives between invocations
fn snapshot_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pland")
        .join("plans.json")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_level.as_deref())?;

    let config = Config::load(cli.config.as_ref())?;
    config.validate()?;

    let llm = create_client(&config.llm).context("Failed to create LLM client")?;

    let path = snapshot_path();
    let repo = Arc::new(MemoryRepository::load_from(&path)?);
    let engine = Engine::new(llm, repo.clone(), config);

    match cli.command {
        Command::Analyze { text, user, prefer } => {
            let creation = engine.create_plan(user, &text, prefer).await?;
            repo.save_to(&path)?;
            info!(plan_id = %creation.plan.id, "plan created");
            cli::render_creation(&creation);
        }

        Command::Show { plan_id, versions } => {
            let plan = engine.load_plan(&plan_id).await?;
            cli::render_plan(&plan);
            if versions {
                let history = engine.list_versions(&plan_id).await?;
                cli::render_versions(&history);
            }
        }

        Command::Conflicts { plan_id, user, date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let resolution = engine.check_conflicts(&plan_id, user, date).await?;
            cli::render_resolution(&resolution);
        }

        Command::Check => {
            if engine.test_connection().await {
                println!("ok");
            } else {
                eprintln!("model unreachable");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
