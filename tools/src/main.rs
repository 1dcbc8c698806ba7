//! synth-runner: headless batch runner for the transaction synthesizer.
//!
//! Usage:
//!   synth-runner --config data/synth_config.json
//!   synth-runner --db synth.db --seed-customers 20000 --total 1000000
//!   synth-runner --db synth.db --total 5000 --batch-size 500 --seed 7 --json

use anyhow::{Context, Result};
use chrono::Utc;
use std::env;
use txnsynth_core::{
    config::SynthConfig,
    customer::seeded_directory,
    orchestrator::{BatchOrchestrator, RunSummary},
    store::SynthStore,
    types::RiskTier,
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config_path = string_arg(&args, "--config");
    let seed_customers = parse_arg(&args, "--seed-customers", 0usize);
    let json = args.iter().any(|a| a == "--json");

    let mut config = base_config(config_path)?;
    if let Some(db) = string_arg(&args, "--db") {
        config.storage.db_path = db.to_string();
    }
    config.seed = parse_arg(&args, "--seed", config.seed);
    config.batch_size = parse_arg(&args, "--batch-size", config.batch_size);
    config.total_records = parse_arg(&args, "--total", config.total_records);
    // The storage path and the target come from the file or a flag, never
    // from a built-in default.
    config.validate().context("invalid configuration")?;

    if !json {
        println!("synth-runner");
        println!("  seed:        {}", config.seed);
        println!("  db:          {}", config.storage.db_path);
        println!("  batch size:  {}", config.batch_size);
        println!("  target:      {}", config.total_records);
        println!();
    }

    let mut store = SynthStore::open(&config.storage.db_path)
        .with_context(|| format!("cannot open {}", config.storage.db_path))?;
    store.migrate()?;

    if seed_customers > 0 {
        let customers = seeded_directory(config.seed, seed_customers, config.reference_time());
        store.insert_customers(&customers)?;
        log::info!("seeded {} customers", customers.len());
    }
    if store.customer_count()? == 0 {
        anyhow::bail!(
            "customer directory in {} is empty; pass --seed-customers N",
            config.storage.db_path
        );
    }

    let run_id = format!("run-{}-{}", config.seed, Utc::now().format("%Y%m%dT%H%M%S"));
    let mut orchestrator = BatchOrchestrator::new(run_id.clone(), config, store)?;
    orchestrator.initialize()?;
    let summary = match orchestrator.run() {
        Ok(summary) => summary,
        Err(e) if orchestrator.unwritten().is_some() => {
            // run() replays the kept batch before generating again.
            log::warn!("{e}; resuming once with the unwritten batch");
            orchestrator.run()?
        }
        Err(e) => return Err(e.into()),
    };

    let store = orchestrator.into_sink();
    if json {
        print_json(&store, &run_id, &summary)?;
    } else {
        print_summary(&store, &run_id, &summary)?;
    }
    Ok(())
}

fn base_config(path: Option<&str>) -> Result<SynthConfig> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("cannot read {path}"))?,
        None => "{}".to_string(),
    };
    // Validation happens after CLI overrides are applied.
    SynthConfig::parse_unvalidated(&raw).context("malformed configuration")
}

fn print_summary(store: &SynthStore, run_id: &str, summary: &RunSummary) -> Result<()> {
    println!("=== RUN SUMMARY ===");
    println!("  run_id:         {run_id}");
    println!("  batches:        {}", summary.batches);
    println!("  total records:  {}", summary.total_records);
    println!("  fraud records:  {}", summary.fraud_records);
    println!("  legitimate:     {}", summary.legitimate_records);
    println!("  skipped:        {}", summary.skipped_candidates);
    if summary.stopped {
        println!("  (stopped before target)");
    }

    println!();
    println!("=== FRAUD DISTRIBUTION ===");
    let shares = store.fraud_distribution()?;
    if shares.is_empty() {
        println!("  (no fraud records)");
    }
    for share in shares {
        println!(
            "  {:<32} {:>8} records  {:>6} customers  {:>6.2}%",
            share.pattern.label(),
            share.records,
            share.unique_customers,
            share.percentage
        );
    }

    println!();
    println!("=== RISK TIERS ===");
    for tier in RiskTier::ALL {
        println!("  {:<8} {:>8}", tier.as_str(), store.tier_count(tier)?);
    }
    Ok(())
}

fn print_json(store: &SynthStore, run_id: &str, summary: &RunSummary) -> Result<()> {
    let distribution: Vec<_> = store
        .fraud_distribution()?
        .into_iter()
        .map(|s| {
            serde_json::json!({
                "pattern": s.pattern.label(),
                "records": s.records,
                "unique_customers": s.unique_customers,
                "percentage": s.percentage,
            })
        })
        .collect();
    let mut tiers = serde_json::Map::new();
    for tier in RiskTier::ALL {
        tiers.insert(tier.as_str().to_string(), store.tier_count(tier)?.into());
    }
    let report = serde_json::json!({
        "run_id": run_id,
        "summary": summary,
        "fraud_distribution": distribution,
        "tiers": tiers,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
