// src/bin/pair_inspector.rs
//
// Scores a single pair of institution records and prints the full signal breakdown.

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use serde::Serialize;

use linkage_lib::matching::confidence::score_pair;
use linkage_lib::matching::normalize::normalize_admin_text;
use linkage_lib::models::matching::{InstitutionRecord, MatchResult};
use linkage_lib::utils::env::load_env;
use linkage_lib::utils::match_config::MatchConfig;

#[derive(Parser)]
#[command(author, version, about = "Explain the match decision for two institution records", long_about = None)]
struct InspectArgs {
    #[arg(long)]
    name_a: String,
    #[arg(long)]
    address_a: Option<String>,
    #[arg(long)]
    province_a: Option<String>,
    #[arg(long)]
    district_a: Option<String>,

    #[arg(long)]
    name_b: String,
    #[arg(long)]
    address_b: Option<String>,
    #[arg(long)]
    province_b: Option<String>,
    #[arg(long)]
    district_b: Option<String>,

    /// JSON match configuration
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

#[derive(Serialize)]
struct Inspection<'a> {
    normalized_name_a: String,
    normalized_name_b: String,
    result: &'a MatchResult,
}

fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let args = InspectArgs::parse();

    let config = match &args.config {
        Some(path) => MatchConfig::from_file(path)?,
        None => MatchConfig::from_env(),
    };

    let a = InstitutionRecord {
        name: args.name_a,
        address: args.address_a,
        province_code: args.province_a,
        district_code: args.district_a,
    };
    let b = InstitutionRecord {
        name: args.name_b,
        address: args.address_b,
        province_code: args.province_b,
        district_code: args.district_b,
    };
    debug!("Inspecting {:?} against {:?}", a, b);

    let result = score_pair(&a, &b, &config);
    match result.confidence {
        Some(confidence) => info!("Match accepted with confidence {}", confidence),
        None => info!("No match: {:?}", result.rejection),
    }

    let inspection = Inspection {
        normalized_name_a: normalize_admin_text(&a.name, &config.normalization),
        normalized_name_b: normalize_admin_text(&b.name, &config.normalization),
        result: &result,
    };
    let json = serde_json::to_string_pretty(&inspection).context("Failed to serialize inspection")?;
    println!("{}", json);
    Ok(())
}
