//! Chunk success models.
//!
//! A model answers one question: given a mode, an SNR (linear ratio) and a
//! number of bits demodulated at that SNR, what is the probability that all of
//! them decode? The interference helper multiplies these per-chunk answers
//! into a packet success rate.

use super::WifiMode;
use crate::signal_calculations::ratio_to_db;

pub trait ErrorRateModel {
    /// Probability in `[0, 1]` that `nbits` bits sent with `mode` at linear `snr` decode without error.
    fn chunk_success_rate(&self, mode: &WifiMode, snr: f64, nbits: u32) -> f64;
}

/// Returns the same success probability for every chunk.
///
/// `1.0` models a perfect receiver, `0.0` a receiver that never decodes.
#[derive(Debug, Clone, Copy)]
pub struct FixedErrorRateModel {
    success_rate: f64,
}

impl FixedErrorRateModel {
    pub fn new(success_rate: f64) -> Self {
        Self {
            success_rate: success_rate.clamp(0.0, 1.0),
        }
    }
}

impl ErrorRateModel for FixedErrorRateModel {
    fn chunk_success_rate(&self, _mode: &WifiMode, _snr: f64, _nbits: u32) -> f64 {
        self.success_rate
    }
}

/// Minimum SNR (dB) per constellation size, in the spirit of receiver sensitivity tables.
///
/// A chunk decodes when its SNR is at or above the threshold of its
/// constellation and fails otherwise. Coarse, but monotonic in SNR.
#[derive(Debug, Clone)]
pub struct SnrThresholdErrorRateModel {
    /// Extra margin added to every threshold (dB).
    pub margin_db: f64,
}

impl SnrThresholdErrorRateModel {
    pub fn new(margin_db: f64) -> Self {
        Self { margin_db }
    }

    /// SNR limit in dB for a given constellation size.
    pub fn snr_limit_db(&self, constellation_size: u16) -> f64 {
        let snr_limit = match constellation_size {
            0..=2 => 4.0,
            3..=4 => 7.0,
            5..=16 => 13.0,
            17..=64 => 19.0,
            _ => 25.0, // Default to the worst case for anything denser
        };
        snr_limit + self.margin_db
    }
}

impl Default for SnrThresholdErrorRateModel {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl ErrorRateModel for SnrThresholdErrorRateModel {
    fn chunk_success_rate(&self, mode: &WifiMode, snr: f64, nbits: u32) -> f64 {
        if nbits == 0 {
            return 1.0;
        }
        if ratio_to_db(snr) >= self.snr_limit_db(mode.constellation_size()) { 1.0 } else { 0.0 }
    }
}
