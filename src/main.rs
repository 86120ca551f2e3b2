use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::fs;
use std::path::PathBuf;

use gridheal::config_loader::{self, CliOverrides};
use gridheal::orchestrator;

/// Decentralized FLISR protocol simulator for distribution feeders
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the scenario YAML file
    #[arg(short, long)]
    config: PathBuf,

    /// Override the fault bus from the scenario
    #[arg(long)]
    fault_bus: Option<u32>,

    /// Override the round cap from the scenario
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Write the per-round trace as JSON to this path
    #[arg(long)]
    trace: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    let mut config = config_loader::load_config(&args.config)?;

    // Scenario log level applies unless RUST_LOG is set
    let default_level = config.general.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    info!(
        "Loaded scenario {:?}: {}",
        args.config,
        config_loader::scenario_summary(&config)
    );

    let overrides = CliOverrides {
        fault_bus: args.fault_bus,
        max_rounds: args.max_rounds,
    };
    config_loader::apply_overrides(&mut config, &overrides)?;

    let outcome = orchestrator::run_scenario(&config).wrap_err("Protocol run failed")?;

    for state in &outcome.switches {
        info!(
            "{:>8} {:<6} {:<13}{}",
            state.name,
            if state.closed { "closed" } else { "open" },
            state.mode.to_string(),
            if state.locked { " (locked)" } else { "" }
        );
    }
    info!(
        "Converged in {} step(s), final round {}",
        outcome.steps, outcome.final_round
    );

    if let Some(path) = &args.trace {
        let json = serde_json::to_string_pretty(&outcome).wrap_err("Failed to serialize trace")?;
        fs::write(path, json)
            .wrap_err_with(|| format!("Failed to write trace to '{}'", path.display()))?;
        info!("Trace written to {:?}", path);
    }

    Ok(())
}
