//! Radio power and noise calculations.
//!
//! Contains helpers for:
//! - dBm / watt / dB conversions
//! - Thermal noise power for a given bandwidth
//! - Log-distance path loss with optional log-normal shadowing
//! - Received power per antenna configuration
//!
//! Units:
//! - Power: watts inside the interference core, dBm at the configuration edge
//! - Distance: meters

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

use crate::interference::{AntennaPowers, NUMBER_OF_ANTENNA_MODES};

/// Boltzmann constant as used by the receiver noise model (J/K).
pub const BOLTZMANN: f64 = 1.3803e-23;

/// Reference temperature for thermal noise (K).
pub const NOISE_TEMPERATURE_KELVIN: f64 = 290.0;

/// Parameters defining the radio channel propagation model.
///
/// Constants of the log-distance path loss model with log-normal shadowing.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct PathLossParameters {
    /// Path loss exponent (n).
    ///
    /// - n = 2.0: Free space
    /// - n = 2.7 to 3.5: Urban areas
    /// - n = 3.0 to 5.0: Indoor obstructed environments
    pub path_loss_exponent: f64,

    /// Standard deviation for log-normal shadowing (σ) in dB. A value of 0.0 disables shadowing.
    #[serde(default)]
    pub shadowing_sigma: f64,

    /// Path loss at the reference distance d₀ (1 meter) in dB.
    pub path_loss_at_reference_distance: f64,
}

impl Default for PathLossParameters {
    fn default() -> Self {
        // 5 GHz log-distance defaults
        Self {
            path_loss_exponent: 3.0,
            shadowing_sigma: 0.0,
            path_loss_at_reference_distance: 46.6777,
        }
    }
}

/// Calculate the path loss (in dB) at a given distance using a log-distance
/// path loss model with log-normal shadowing.
///
/// # Formula
///
/// ```text
/// PL(d) = PL(d₀) + 10 × n × log₁₀(d/d₀) + X_σ
/// where d₀ = 1 meter (reference distance)
/// ```
///
/// # Notes
///
/// - For distances < 1.0 meter, returns the reference path loss without further attenuation
/// - The shadowing term is drawn from `rng`, so a seeded generator gives repeatable runs
pub fn calculate_path_loss<R: Rng + ?Sized>(distance: f64, params: &PathLossParameters, rng: &mut R) -> f64 {
    if distance < 1.0 {
        return params.path_loss_at_reference_distance;
    }
    let path_loss = params.path_loss_at_reference_distance + 10.0 * params.path_loss_exponent * distance.log10();
    // Sample log-normal shadowing as a Normal(0, sigma) in dB
    let shadowing = match Normal::new(0.0_f64, params.shadowing_sigma) {
        Ok(normal) if params.shadowing_sigma > 0.0 => normal.sample(rng),
        _ => 0.0,
    };
    path_loss + shadowing
}

/// Received power in watts for every antenna configuration.
///
/// `gains_db[A]` is the receive gain of configuration `A`; missing entries count as 0 dB.
pub fn calculate_rx_power_w(tx_power_dbm: f64, path_loss_db: f64, gains_db: &[f64]) -> AntennaPowers {
    let mut powers = [0.0; NUMBER_OF_ANTENNA_MODES];
    for (index, power) in powers.iter_mut().enumerate() {
        let gain = gains_db.get(index).copied().unwrap_or(0.0);
        *power = dbm_to_w(tx_power_dbm - path_loss_db + gain);
    }
    AntennaPowers::new(powers)
}

/// Thermal noise power (W) at 290 K over `bandwidth_hz`: `N = k_B × T × B`.
pub fn thermal_noise_w(bandwidth_hz: u32) -> f64 {
    BOLTZMANN * NOISE_TEMPERATURE_KELVIN * bandwidth_hz as f64
}

/// Convert power from dBm to watts.
///
/// ```text
/// P(W) = 10^((P(dBm) - 30) / 10)
/// ```
pub fn dbm_to_w(dbm: f64) -> f64 {
    10f64.powf((dbm - 30.0) / 10.0)
}

/// Convert power from watts to dBm. For `w <= 0` the result is -∞ or NaN.
pub fn w_to_dbm(w: f64) -> f64 {
    10.0 * w.log10() + 30.0
}

/// Linear power ratio to decibels.
pub fn ratio_to_db(ratio: f64) -> f64 {
    10.0 * ratio.log10()
}

/// Decibels to a linear power ratio.
pub fn db_to_ratio(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn default_pathloss() -> PathLossParameters {
        PathLossParameters {
            path_loss_exponent: 2.0,
            shadowing_sigma: 0.0,
            path_loss_at_reference_distance: 40.0,
        }
    }

    #[test]
    fn path_loss_grows_with_distance() {
        let mut rng = StdRng::seed_from_u64(7);
        let params = default_pathloss();
        assert_eq!(calculate_path_loss(0.5, &params, &mut rng), 40.0);
        assert!((calculate_path_loss(10.0, &params, &mut rng) - 60.0).abs() < 1e-9);
        assert!((calculate_path_loss(100.0, &params, &mut rng) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn shadowing_is_repeatable_with_a_seed() {
        let params = PathLossParameters {
            shadowing_sigma: 6.0,
            ..default_pathloss()
        };
        let a = calculate_path_loss(50.0, &params, &mut StdRng::seed_from_u64(11));
        let b = calculate_path_loss(50.0, &params, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }

    #[test]
    fn thermal_noise_for_20mhz_is_about_minus_101_dbm() {
        let noise = thermal_noise_w(20_000_000);
        assert!((noise - 8.00574e-14).abs() < 1e-18);
        assert!((w_to_dbm(noise) + 100.97).abs() < 0.01);
    }

    #[test]
    fn rx_power_applies_per_configuration_gain() {
        let powers = calculate_rx_power_w(20.0, 80.0, &[0.0, 10.0]);
        assert!((w_to_dbm(powers.as_array()[0]) + 60.0).abs() < 1e-9);
        assert!((w_to_dbm(powers.as_array()[1]) + 50.0).abs() < 1e-9);
        // Configurations without a listed gain fall back to 0 dB
        assert!((w_to_dbm(powers.as_array()[2]) + 60.0).abs() < 1e-9);
    }

    #[test]
    fn dbm_w_conversion_roundtrip_reasonable() {
        for v in [-100.0, -50.0, 0.0, 10.0] {
            assert!((v - w_to_dbm(dbm_to_w(v))).abs() < 1e-9);
        }
        assert!((dbm_to_w(30.0) - 1.0).abs() < 1e-12);
        assert!((ratio_to_db(db_to_ratio(7.0)) - 7.0).abs() < 1e-12);
    }
}
