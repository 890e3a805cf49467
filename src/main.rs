use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use linkage_lib::matching::manager::run_matching_batch;
use linkage_lib::models::matching::{InstitutionEntry, TargetMatches};
use linkage_lib::models::stats_models::MatchingStats;
use linkage_lib::utils::env::load_env;
use linkage_lib::utils::match_config::MatchConfig;
use linkage_lib::utils::progress_bars::progress_config::ProgressConfig;
use log::info;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Match mandated-installation targets to device-installation records", long_about = None)]
struct MatchArgs {
    /// JSON array of target institutions
    #[arg(long)]
    targets: PathBuf,

    /// JSON array of installation records to match against
    #[arg(long)]
    installations: PathBuf,

    /// JSON match configuration (defaults plus environment overrides when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Ranked candidates kept per target
    #[arg(long)]
    top: Option<usize>,
}

#[derive(Serialize)]
struct MatchReport {
    run_id: String,
    generated_at: DateTime<Utc>,
    stats: MatchingStats,
    results: Vec<TargetMatches>,
}

fn read_entries(path: &Path) -> Result<Vec<InstitutionEntry>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse institution records from {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging and environment
    env_logger::init();
    info!("Starting institution record-linkage run");
    load_env();

    let args = MatchArgs::parse();

    let mut config = match &args.config {
        Some(path) => MatchConfig::from_file(path)?,
        None => MatchConfig::from_env(),
    };
    if let Some(top) = args.top {
        config.max_results = top;
    }
    config.log_config();

    let targets = read_entries(&args.targets).context("Failed to load targets")?;
    let installations = read_entries(&args.installations).context("Failed to load installations")?;
    info!(
        "Loaded {} targets and {} installations",
        targets.len(),
        installations.len()
    );

    let progress_config = ProgressConfig::from_env();
    let pb = progress_config.create_progress_bar(targets.len() as u64, "Matching targets...");

    let run_id = Uuid::new_v4().to_string();
    let (results, stats) = run_matching_batch(&run_id, targets, installations, Arc::new(config), pb)
        .await
        .context("Matching run failed")?;

    let report = MatchReport {
        run_id,
        generated_at: Utc::now(),
        stats,
        results,
    };
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize match report")?;

    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote match report to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json).context("Failed to write match report to stdout")?;
        }
    }

    Ok(())
}
