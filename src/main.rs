use anyhow::{Context, Result};
use env_logger::Builder;
use log::{LevelFilter, error, info};
use std::path::PathBuf;

use wifi_interference_simulator::scenario::{ScenarioConfig, run_scenario};

fn main() {
    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("wifi_interference_simulator"), LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Starting up");

    if let Err(e) = run() {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("Usage: wifi-interference-simulator <scenario.toml>")?;
    let config = ScenarioConfig::load(&path)?;
    info!("Loaded scenario {}", path.display());

    let report = run_scenario(&config)?;
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{json}");
    Ok(())
}
