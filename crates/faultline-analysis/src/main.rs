//! CLI entry point for the faultline architecture analyzer.
//!
//! Reads a YAML or JSON architecture definition, runs the analysis
//! pipeline, and writes JSON to stdout. Logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use faultline_analysis::{AnalysisConfig, AnalysisEngine};
use faultline_core::ArchitectureDefinition;
use faultline_runlog::RunId;

#[derive(Parser)]
#[command(name = "faultline")]
#[command(about = "Failure simulation and security analysis for architecture models")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: faultline).
    #[arg(short, long, default_value = faultline_core::config::DEFAULT_CONFIG_PREFIX, global = true)]
    config: String,

    /// Override the run storage directory.
    #[arg(long, global = true)]
    runs_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze an architecture definition (.yaml, .yml, or .json).
    Analyze {
        path: PathBuf,
    },
    /// Print the stored report of a run.
    Report {
        /// Run ID (`7`, `007`, or `run_007`).
        run_id: String,
    },
    /// Print the event log of a run.
    Events {
        run_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let mut config = AnalysisConfig::load(&cli.config)?;
    if let Some(dir) = &cli.runs_dir {
        config.runs_dir = dir.display().to_string();
    }
    let engine = AnalysisEngine::from_config(config)?;

    match cli.command {
        Command::Analyze { ref path } => {
            let definition = read_definition(path)?;
            let run_id = engine.start_run(definition).await?;
            let report = engine.get_report(run_id)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "run_id": run_id.to_string(),
                    "report": report,
                }))?
            );
        }
        Command::Report { ref run_id } => {
            let report = engine.get_report(parse_run_id(run_id)?)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Events { ref run_id } => {
            let events = engine.get_events(parse_run_id(run_id)?)?;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
    }

    Ok(())
}

fn parse_run_id(raw: &str) -> anyhow::Result<RunId> {
    raw.parse::<RunId>()
        .with_context(|| format!("invalid run id: {raw}"))
}

fn read_definition(path: &Path) -> anyhow::Result<ArchitectureDefinition> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let definition = if is_json {
        serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))?
    } else {
        serde_yaml::from_str(&raw).with_context(|| format!("invalid YAML in {}", path.display()))?
    };
    Ok(definition)
}
