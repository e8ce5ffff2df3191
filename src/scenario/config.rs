//! Scenario file format.
//!
//! Scenarios are TOML documents with kebab-case keys:
//!
//! ```toml
//! noise-figure-db = 7.0
//! cca-threshold-dbm = -62.0
//! seed = 42
//! antenna-gains-db = [0.0, 3.0]
//!
//! [error-model]
//! type = "threshold"
//! margin-db = 1.0
//!
//! [[transmissions]]
//! label = "frame"
//! start-us = 0
//! duration-us = 200
//! mode = "OfdmRate24Mbps"
//! tx-power-dbm = 16.0
//! distance-m = 20.0
//! receive = true
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;

use crate::interference::NUMBER_OF_ANTENNA_MODES;
use crate::phy::WifiPreamble;
use crate::phy::error_rate::{ErrorRateModel, FixedErrorRateModel, SnrThresholdErrorRateModel};
use crate::phy::{ModulationClass, find_mode};
use crate::signal_calculations::PathLossParameters;

const MAX_TRANSMISSIONS: usize = 100_000;
const MIN_TX_POWER_DBM: f64 = -30.0;
const MAX_TX_POWER_DBM: f64 = 40.0;

fn default_noise_figure_db() -> f64 {
    7.0
}

fn default_cca_threshold_dbm() -> f64 {
    -62.0
}

fn default_size() -> u32 {
    1000
}

fn default_nss() -> u8 {
    1
}

fn default_preamble() -> WifiPreamble {
    WifiPreamble::Long
}

fn default_background_mode() -> String {
    "OfdmRate6Mbps".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScenarioConfig {
    /// Receiver noise figure in dB.
    #[serde(default = "default_noise_figure_db")]
    pub noise_figure_db: f64,
    /// Energy detection threshold used for the busy-medium checks.
    #[serde(default = "default_cca_threshold_dbm")]
    pub cca_threshold_dbm: f64,
    /// Seed for shadowing, background traffic and reception outcomes.
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub error_model: ErrorModelConfig,
    #[serde(default)]
    pub path_loss: PathLossParameters,
    /// Receive gain of each antenna configuration; missing entries count as 0 dB.
    #[serde(default)]
    pub antenna_gains_db: Vec<f64>,
    #[serde(default)]
    pub antenna_changes: Vec<AntennaChange>,
    #[serde(default)]
    pub transmissions: Vec<TransmissionConfig>,
    #[serde(default)]
    pub background_traffic: Option<BackgroundTrafficConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ErrorModelConfig {
    /// Every chunk succeeds with the same probability.
    #[serde(rename_all = "kebab-case")]
    Fixed { success_rate: f64 },
    /// Chunks succeed above a per-constellation SNR limit.
    #[serde(rename_all = "kebab-case")]
    Threshold {
        #[serde(default)]
        margin_db: f64,
    },
}

impl Default for ErrorModelConfig {
    fn default() -> Self {
        ErrorModelConfig::Threshold { margin_db: 0.0 }
    }
}

impl ErrorModelConfig {
    pub fn build(&self) -> Rc<dyn ErrorRateModel> {
        match self {
            ErrorModelConfig::Fixed { success_rate } => Rc::new(FixedErrorRateModel::new(*success_rate)),
            ErrorModelConfig::Threshold { margin_db } => Rc::new(SnrThresholdErrorRateModel::new(*margin_db)),
        }
    }
}

/// Switch the receiver to antenna configuration `mode` at `at_us`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AntennaChange {
    pub at_us: u64,
    pub mode: usize,
}

/// One frame on air.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TransmissionConfig {
    #[serde(default)]
    pub label: String,
    pub start_us: u64,
    pub duration_us: u64,
    /// Payload size in bytes.
    #[serde(default = "default_size")]
    pub size: u32,
    /// Catalog name of the payload mode, e.g. `"HtMcs7"`.
    pub mode: String,
    #[serde(default = "default_preamble")]
    pub preamble: WifiPreamble,
    /// Spatial streams.
    #[serde(default = "default_nss")]
    pub nss: u8,
    pub tx_power_dbm: f64,
    pub distance_m: f64,
    /// Evaluate this frame at the receiver; otherwise it only interferes.
    #[serde(default)]
    pub receive: bool,
}

/// Randomly generated interfering frames.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BackgroundTrafficConfig {
    pub count: usize,
    /// Mean of the exponential inter-arrival time.
    pub mean_interval_us: f64,
    pub duration_us: u64,
    #[serde(default = "default_background_mode")]
    pub mode: String,
    pub tx_power_dbm: f64,
    pub min_distance_m: f64,
    pub max_distance_m: f64,
}

impl ScenarioConfig {
    /// Read, parse and validate a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse and validate a scenario from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: ScenarioConfig = toml::from_str(content).context("Invalid TOML format")?;
        config.validate().map_err(anyhow::Error::msg).context("Invalid scenario")?;
        Ok(config)
    }

    /// Check the scenario for values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if !self.noise_figure_db.is_finite() || self.noise_figure_db < 0.0 {
            return Err(format!("Invalid noise-figure-db {}, must be a non-negative number", self.noise_figure_db));
        }
        if !self.cca_threshold_dbm.is_finite() {
            return Err("Invalid cca-threshold-dbm, must be a finite number".to_string());
        }
        if let ErrorModelConfig::Fixed { success_rate } = self.error_model {
            if !(0.0..=1.0).contains(&success_rate) {
                return Err(format!("Invalid success-rate {}, must be within 0-1", success_rate));
            }
        }

        // Validate path loss parameters
        if self.path_loss.path_loss_exponent <= 0.0 {
            return Err(format!(
                "Invalid path-loss-exponent {}, must be positive",
                self.path_loss.path_loss_exponent
            ));
        }
        if self.path_loss.shadowing_sigma < 0.0 {
            return Err(format!("Invalid shadowing-sigma {}, must be non-negative", self.path_loss.shadowing_sigma));
        }

        if self.antenna_gains_db.len() > NUMBER_OF_ANTENNA_MODES {
            return Err(format!(
                "{} antenna gains given, receiver has {} configurations",
                self.antenna_gains_db.len(),
                NUMBER_OF_ANTENNA_MODES
            ));
        }
        for change in &self.antenna_changes {
            if change.mode >= NUMBER_OF_ANTENNA_MODES {
                return Err(format!(
                    "Antenna change at {}us selects mode {}, must be 0-{}",
                    change.at_us,
                    change.mode,
                    NUMBER_OF_ANTENNA_MODES - 1
                ));
            }
        }

        let background = self.background_traffic.as_ref().map_or(0, |traffic| traffic.count);
        if self.transmissions.is_empty() && background == 0 {
            return Err("Scenario must contain at least one transmission".to_string());
        }
        if self.transmissions.len() + background > MAX_TRANSMISSIONS {
            return Err(format!(
                "Transmission count {} exceeds maximum of {}",
                self.transmissions.len() + background,
                MAX_TRANSMISSIONS
            ));
        }

        // Check for duplicate labels
        let mut labels = HashSet::new();
        for transmission in self.transmissions.iter().filter(|t| !t.label.is_empty()) {
            if !labels.insert(transmission.label.as_str()) {
                return Err(format!("Duplicate transmission label found: {}", transmission.label));
            }
        }

        for (index, transmission) in self.transmissions.iter().enumerate() {
            validate_transmission(index, transmission)?;
        }

        if let Some(traffic) = &self.background_traffic {
            validate_background(traffic)?;
        }
        Ok(())
    }
}

fn validate_transmission(index: usize, transmission: &TransmissionConfig) -> Result<(), String> {
    let name = if transmission.label.is_empty() {
        format!("#{index}")
    } else {
        transmission.label.clone()
    };
    let Some(mode) = find_mode(&transmission.mode) else {
        return Err(format!("Transmission {} uses unknown mode '{}'", name, transmission.mode));
    };
    if transmission.preamble.is_ht() && mode.class() != ModulationClass::Ht {
        return Err(format!(
            "Transmission {} uses {:?} preamble with non-HT mode '{}'",
            name, transmission.preamble, transmission.mode
        ));
    }
    if transmission.duration_us == 0 {
        return Err(format!("Transmission {} has zero duration", name));
    }
    if !(1..=4).contains(&transmission.nss) {
        return Err(format!("Transmission {} nss {} must be 1-4", name, transmission.nss));
    }
    if transmission.tx_power_dbm < MIN_TX_POWER_DBM || transmission.tx_power_dbm > MAX_TX_POWER_DBM {
        return Err(format!(
            "Transmission {} tx-power-dbm {} outside realistic range ({} to {} dBm)",
            name, transmission.tx_power_dbm, MIN_TX_POWER_DBM, MAX_TX_POWER_DBM
        ));
    }
    if !transmission.distance_m.is_finite() || transmission.distance_m < 0.0 {
        return Err(format!("Transmission {} distance-m {} must be non-negative", name, transmission.distance_m));
    }
    Ok(())
}

fn validate_background(traffic: &BackgroundTrafficConfig) -> Result<(), String> {
    if find_mode(&traffic.mode).is_none() {
        return Err(format!("Background traffic uses unknown mode '{}'", traffic.mode));
    }
    if !traffic.mean_interval_us.is_finite() || traffic.mean_interval_us <= 0.0 {
        return Err(format!("Invalid mean-interval-us {}, must be positive", traffic.mean_interval_us));
    }
    if traffic.duration_us == 0 {
        return Err("Background traffic has zero duration".to_string());
    }
    if traffic.tx_power_dbm < MIN_TX_POWER_DBM || traffic.tx_power_dbm > MAX_TX_POWER_DBM {
        return Err(format!(
            "Background tx-power-dbm {} outside realistic range ({} to {} dBm)",
            traffic.tx_power_dbm, MIN_TX_POWER_DBM, MAX_TX_POWER_DBM
        ));
    }
    if traffic.min_distance_m < 0.0 || traffic.max_distance_m < traffic.min_distance_m {
        return Err(format!(
            "Invalid background distance range {}-{} m",
            traffic.min_distance_m, traffic.max_distance_m
        ));
    }
    Ok(())
}
