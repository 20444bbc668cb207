use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use staffline_match_engine::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Staffline: match clients with virtual assistants
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Engine configuration file (JSON)
    #[arg(short, long, env = "STAFFLINE_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank assistants against client requirements
    Rank {
        #[command(flatten)]
        input: Input,

        /// Number of matches to return
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Rank, then reserve capacity on the best assistant that has room
    Assign {
        #[command(flatten)]
        input: Input,

        /// Client the work is for
        #[arg(long, default_value = "cli")]
        requester: String,
    },
}

#[derive(Args, Debug)]
struct Input {
    /// Assistant profiles (JSON array)
    #[arg(long)]
    profiles: PathBuf,

    /// Client requirements (JSON object)
    #[arg(long)]
    requirements: PathBuf,

    /// SQLite URL to seed and use instead of the in-memory store
    #[arg(long, env = "STAFFLINE_DB")]
    db: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},staffline=info", cli.log_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };

    let output = match cli.command {
        Command::Rank { input, limit } => {
            let (engine, requirements) = setup(&mut config, &input).await?;
            let report = engine.find_matches_with_report(&requirements, limit).await?;
            info!(
                "📊 {} match(es), {} disqualified",
                report.matches.len(),
                report.disqualified.len()
            );
            serde_json::to_value(&report)?
        }
        Command::Assign { input, requester } => {
            let (engine, requirements) = setup(&mut config, &input).await?;
            match engine.assign_best_match(&requester, &requirements).await? {
                BestMatchOutcome::Assigned { assignment, matched } => json!({
                    "outcome": "assigned",
                    "assignment": assignment,
                    "match": matched,
                }),
                BestMatchOutcome::Exhausted { attempted, contended } => {
                    warn!("No assistant had capacity ({} attempted, {} contended)", attempted, contended);
                    json!({
                        "outcome": "exhausted",
                        "attempted": attempted,
                        "contended": contended,
                    })
                }
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Build the engine, seed it with the profile fixture and parse requirements
async fn setup(config: &mut EngineConfig, input: &Input) -> Result<(MatchEngine, MatchRequirements)> {
    let profiles: Vec<AssistantProfile> = read_json(&input.profiles)?;
    let requirements: MatchRequirementsBuilder = read_json(&input.requirements)?;
    let requirements = requirements.build()?;

    if let Some(url) = &input.db {
        config.database.url = Some(url.clone());
    }
    let engine = match config.database.url {
        Some(_) => MatchEngine::with_sqlite(config.clone()).await?,
        None => MatchEngine::in_memory(config.clone())?,
    };

    let count = profiles.len();
    for profile in profiles {
        let id = profile.id.clone();
        engine
            .register_assistant(profile)
            .await
            .with_context(|| format!("invalid profile {}", id))?;
    }
    info!("👥 Loaded {} assistant profile(s)", count);

    Ok((engine, requirements))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("cannot parse {}", path.display()))
}
