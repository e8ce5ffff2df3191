//! Value types shared by the ledger, the events and the SNR/PER calculator.

use serde::Serialize;
use std::fmt;
use std::ops::{Add, AddAssign, Index, Neg, Sub, SubAssign};

use super::error::InterferenceError;

/// Number of selectable receive antenna configurations.
pub const NUMBER_OF_ANTENNA_MODES: usize = 5;

/// Index of one receive antenna configuration, always in `0..NUMBER_OF_ANTENNA_MODES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct AntennaMode(pub(crate) usize);

impl AntennaMode {
    pub fn new(index: usize) -> Result<Self, InterferenceError> {
        if index < NUMBER_OF_ANTENNA_MODES {
            Ok(Self(index))
        } else {
            Err(InterferenceError::InvalidAntennaMode {
                index,
                count: NUMBER_OF_ANTENNA_MODES,
            })
        }
    }

    pub fn index(self) -> usize {
        self.0
    }

    pub fn all() -> impl Iterator<Item = AntennaMode> {
        (0..NUMBER_OF_ANTENNA_MODES).map(AntennaMode)
    }
}

impl fmt::Display for AntennaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One power figure (W) per antenna configuration.
///
/// Used both for absolute powers (received power, ledger baseline) and for
/// signed deltas stored in ledger records.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AntennaPowers([f64; NUMBER_OF_ANTENNA_MODES]);

impl AntennaPowers {
    pub const ZERO: AntennaPowers = AntennaPowers([0.0; NUMBER_OF_ANTENNA_MODES]);

    pub fn new(powers: [f64; NUMBER_OF_ANTENNA_MODES]) -> Self {
        Self(powers)
    }

    /// Same power on every configuration.
    pub fn uniform(power: f64) -> Self {
        Self([power; NUMBER_OF_ANTENNA_MODES])
    }

    pub fn get(&self, mode: AntennaMode) -> f64 {
        self.0[mode.0]
    }

    pub fn as_array(&self) -> &[f64; NUMBER_OF_ANTENNA_MODES] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|p| *p == 0.0)
    }
}

impl Index<AntennaMode> for AntennaPowers {
    type Output = f64;

    fn index(&self, mode: AntennaMode) -> &f64 {
        &self.0[mode.0]
    }
}

impl Neg for AntennaPowers {
    type Output = AntennaPowers;

    fn neg(self) -> AntennaPowers {
        AntennaPowers(self.0.map(|p| -p))
    }
}

impl Add for AntennaPowers {
    type Output = AntennaPowers;

    fn add(mut self, rhs: AntennaPowers) -> AntennaPowers {
        self += rhs;
        self
    }
}

impl AddAssign for AntennaPowers {
    fn add_assign(&mut self, rhs: AntennaPowers) {
        for (lhs, rhs) in self.0.iter_mut().zip(rhs.0) {
            *lhs += rhs;
        }
    }
}

impl Sub for AntennaPowers {
    type Output = AntennaPowers;

    fn sub(mut self, rhs: AntennaPowers) -> AntennaPowers {
        self -= rhs;
        self
    }
}

impl SubAssign for AntennaPowers {
    fn sub_assign(&mut self, rhs: AntennaPowers) {
        for (lhs, rhs) in self.0.iter_mut().zip(rhs.0) {
            *lhs -= rhs;
        }
    }
}

/// Opaque identity of a reception event. Ledger records are matched to their
/// event through this id, never through power values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EventId(pub(crate) u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of evaluating one reception.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SnrPer {
    /// SNR at the start of the reception (linear ratio).
    pub snr: f64,
    /// Packet error rate in `[0, 1]`.
    pub per: f64,
    /// Interference power (W) at the start of the reception, excluding the
    /// reception itself.
    pub interference_w: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn antenna_mode_rejects_out_of_range_index() {
        assert!(AntennaMode::new(NUMBER_OF_ANTENNA_MODES - 1).is_ok());
        assert_eq!(
            AntennaMode::new(NUMBER_OF_ANTENNA_MODES),
            Err(InterferenceError::InvalidAntennaMode {
                index: NUMBER_OF_ANTENNA_MODES,
                count: NUMBER_OF_ANTENNA_MODES
            })
        );
        assert_eq!(AntennaMode::all().count(), NUMBER_OF_ANTENNA_MODES);
    }

    #[test]
    fn powers_negate_and_cancel_componentwise() {
        let p = AntennaPowers::new([1.0, 2.0, 0.5, 0.25, 0.0]);
        assert!((p + -p).is_zero());
        assert_eq!(p - p, AntennaPowers::ZERO);
        assert_eq!(p[AntennaMode::new(1).unwrap()], 2.0);
        assert_eq!((p + p).get(AntennaMode::new(2).unwrap()), 1.0);
    }
}
