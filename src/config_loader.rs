use crate::config::Config;
use crate::grid::BusId;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// Load and parse a scenario from a YAML file.
///
/// Runs before the logger exists, so nothing is logged here; see
/// [`scenario_summary`].
pub fn load_config(config_path: &Path) -> Result<Config> {
    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open scenario file {:?}", config_path))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse scenario file {:?}", config_path))?;

    config.validate()?;

    Ok(config)
}

/// One-line description of a loaded scenario
pub fn scenario_summary(config: &Config) -> String {
    format!(
        "{} buses, {} lines, {} switches, fault at bus {}",
        config.grid.buses.len(),
        config.grid.lines.len(),
        config.grid.switches.len(),
        config.fault.bus
    )
}

/// CLI arguments that can override YAML settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub fault_bus: Option<BusId>,
    pub max_rounds: Option<u32>,
}

/// Apply CLI overrides to a loaded scenario
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) -> Result<()> {
    if let Some(bus) = overrides.fault_bus {
        info!("Fault bus overridden from {} to {}", config.fault.bus, bus);
        config.fault.bus = bus;
    }

    if let Some(max_rounds) = overrides.max_rounds {
        info!("Round cap overridden to {}", max_rounds);
        config.general.max_rounds = Some(max_rounds);
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}
