//! PHY-level descriptors consumed by the interference core.
//!
//! - `WifiMode`: one modulation/coding scheme (bandwidth, raw PHY rate, constellation)
//! - `WifiPreamble`: frame format selecting the PLCP field layout
//! - `TxVector`: per-frame transmit parameters (spatial streams for HT training)
//! - `timing`: preamble/header/HT-SIG/training durations and header modes
//! - `error_rate`: chunk success models
//!
//! Rates are in bit/s, bandwidths in Hz.

pub mod error_rate;
pub mod timing;

use serde::{Deserialize, Serialize};

/// Modulation family a mode belongs to. PLCP timings are looked up by class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModulationClass {
    /// 802.11b DSSS/CCK
    Dsss,
    /// 802.11a/g OFDM
    Ofdm,
    /// 802.11n high throughput
    Ht,
}

/// A single modulation and coding scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WifiMode {
    name: &'static str,
    class: ModulationClass,
    bandwidth_hz: u32,
    /// Coded bit rate on air (data rate divided by the code rate).
    phy_rate_bps: u64,
    data_rate_bps: u64,
    constellation_size: u16,
}

impl WifiMode {
    pub const fn new(
        name: &'static str,
        class: ModulationClass,
        bandwidth_hz: u32,
        phy_rate_bps: u64,
        data_rate_bps: u64,
        constellation_size: u16,
    ) -> Self {
        Self {
            name,
            class,
            bandwidth_hz,
            phy_rate_bps,
            data_rate_bps,
            constellation_size,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn class(&self) -> ModulationClass {
        self.class
    }

    pub fn bandwidth_hz(&self) -> u32 {
        self.bandwidth_hz
    }

    pub fn phy_rate_bps(&self) -> u64 {
        self.phy_rate_bps
    }

    pub fn data_rate_bps(&self) -> u64 {
        self.data_rate_bps
    }

    pub fn constellation_size(&self) -> u16 {
        self.constellation_size
    }
}

// 802.11b
pub const DSSS_RATE_1MBPS: WifiMode = WifiMode::new("DsssRate1Mbps", ModulationClass::Dsss, 22_000_000, 1_000_000, 1_000_000, 2);
pub const DSSS_RATE_2MBPS: WifiMode = WifiMode::new("DsssRate2Mbps", ModulationClass::Dsss, 22_000_000, 2_000_000, 2_000_000, 4);
pub const DSSS_RATE_5_5MBPS: WifiMode = WifiMode::new("DsssRate5_5Mbps", ModulationClass::Dsss, 22_000_000, 5_500_000, 5_500_000, 16);
pub const DSSS_RATE_11MBPS: WifiMode = WifiMode::new("DsssRate11Mbps", ModulationClass::Dsss, 22_000_000, 11_000_000, 11_000_000, 256);

// 802.11a/g, 20 MHz
pub const OFDM_RATE_6MBPS: WifiMode = WifiMode::new("OfdmRate6Mbps", ModulationClass::Ofdm, 20_000_000, 12_000_000, 6_000_000, 2);
pub const OFDM_RATE_9MBPS: WifiMode = WifiMode::new("OfdmRate9Mbps", ModulationClass::Ofdm, 20_000_000, 12_000_000, 9_000_000, 2);
pub const OFDM_RATE_12MBPS: WifiMode = WifiMode::new("OfdmRate12Mbps", ModulationClass::Ofdm, 20_000_000, 24_000_000, 12_000_000, 4);
pub const OFDM_RATE_18MBPS: WifiMode = WifiMode::new("OfdmRate18Mbps", ModulationClass::Ofdm, 20_000_000, 24_000_000, 18_000_000, 4);
pub const OFDM_RATE_24MBPS: WifiMode = WifiMode::new("OfdmRate24Mbps", ModulationClass::Ofdm, 20_000_000, 48_000_000, 24_000_000, 16);
pub const OFDM_RATE_36MBPS: WifiMode = WifiMode::new("OfdmRate36Mbps", ModulationClass::Ofdm, 20_000_000, 48_000_000, 36_000_000, 16);
pub const OFDM_RATE_48MBPS: WifiMode = WifiMode::new("OfdmRate48Mbps", ModulationClass::Ofdm, 20_000_000, 72_000_000, 48_000_000, 64);
pub const OFDM_RATE_54MBPS: WifiMode = WifiMode::new("OfdmRate54Mbps", ModulationClass::Ofdm, 20_000_000, 72_000_000, 54_000_000, 64);

// Half and quarter clocked OFDM, only needed as PLCP header modes
pub const OFDM_RATE_3MBPS_BW10MHZ: WifiMode = WifiMode::new("OfdmRate3MbpsBW10MHz", ModulationClass::Ofdm, 10_000_000, 6_000_000, 3_000_000, 2);
pub const OFDM_RATE_1_5MBPS_BW5MHZ: WifiMode = WifiMode::new("OfdmRate1_5MbpsBW5MHz", ModulationClass::Ofdm, 5_000_000, 3_000_000, 1_500_000, 2);

// 802.11n, 20 MHz, long guard interval
pub const HT_MCS0: WifiMode = WifiMode::new("HtMcs0", ModulationClass::Ht, 20_000_000, 13_000_000, 6_500_000, 2);
pub const HT_MCS1: WifiMode = WifiMode::new("HtMcs1", ModulationClass::Ht, 20_000_000, 26_000_000, 13_000_000, 4);
pub const HT_MCS2: WifiMode = WifiMode::new("HtMcs2", ModulationClass::Ht, 20_000_000, 26_000_000, 19_500_000, 4);
pub const HT_MCS3: WifiMode = WifiMode::new("HtMcs3", ModulationClass::Ht, 20_000_000, 52_000_000, 26_000_000, 16);
pub const HT_MCS4: WifiMode = WifiMode::new("HtMcs4", ModulationClass::Ht, 20_000_000, 52_000_000, 39_000_000, 16);
pub const HT_MCS5: WifiMode = WifiMode::new("HtMcs5", ModulationClass::Ht, 20_000_000, 78_000_000, 52_000_000, 64);
pub const HT_MCS6: WifiMode = WifiMode::new("HtMcs6", ModulationClass::Ht, 20_000_000, 78_000_000, 58_500_000, 64);
pub const HT_MCS7: WifiMode = WifiMode::new("HtMcs7", ModulationClass::Ht, 20_000_000, 78_000_000, 65_000_000, 64);

const ALL_MODES: [WifiMode; 22] = [
    DSSS_RATE_1MBPS,
    DSSS_RATE_2MBPS,
    DSSS_RATE_5_5MBPS,
    DSSS_RATE_11MBPS,
    OFDM_RATE_6MBPS,
    OFDM_RATE_9MBPS,
    OFDM_RATE_12MBPS,
    OFDM_RATE_18MBPS,
    OFDM_RATE_24MBPS,
    OFDM_RATE_36MBPS,
    OFDM_RATE_48MBPS,
    OFDM_RATE_54MBPS,
    OFDM_RATE_3MBPS_BW10MHZ,
    OFDM_RATE_1_5MBPS_BW5MHZ,
    HT_MCS0,
    HT_MCS1,
    HT_MCS2,
    HT_MCS3,
    HT_MCS4,
    HT_MCS5,
    HT_MCS6,
    HT_MCS7,
];

/// Every mode the crate knows about.
pub fn all_modes() -> &'static [WifiMode] {
    &ALL_MODES
}

/// Look a mode up by its catalog name (e.g. `"OfdmRate54Mbps"`, `"HtMcs7"`).
pub fn find_mode(name: &str) -> Option<WifiMode> {
    ALL_MODES.iter().copied().find(|mode| mode.name == name)
}

/// PLCP frame format.
///
/// Legacy formats carry a single PLCP header; HT mixed format adds HT-SIG and
/// HT training fields after the legacy L-SIG; HT greenfield drops the L-SIG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WifiPreamble {
    Long,
    Short,
    HtMixedFormat,
    HtGreenfield,
}

impl WifiPreamble {
    pub fn is_ht(self) -> bool {
        matches!(self, WifiPreamble::HtMixedFormat | WifiPreamble::HtGreenfield)
    }
}

/// Per-frame transmit parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TxVector {
    pub mode: WifiMode,
    /// Number of spatial streams.
    pub nss: u8,
    /// Number of extension spatial streams.
    pub ness: u8,
    pub short_guard_interval: bool,
}

impl TxVector {
    pub fn new(mode: WifiMode) -> Self {
        Self {
            mode,
            nss: 1,
            ness: 0,
            short_guard_interval: false,
        }
    }

    pub fn with_streams(mut self, nss: u8, ness: u8) -> Self {
        self.nss = nss;
        self.ness = ness;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_names_are_unique_and_resolvable() {
        for mode in all_modes() {
            assert_eq!(all_modes().iter().filter(|m| m.name() == mode.name()).count(), 1, "duplicate {}", mode.name());
            assert_eq!(find_mode(mode.name()), Some(*mode));
        }
        assert_eq!(find_mode("NoSuchMode"), None);
    }

    #[test]
    fn phy_rate_never_below_data_rate() {
        for mode in all_modes() {
            assert!(mode.phy_rate_bps() >= mode.data_rate_bps(), "{}", mode.name());
        }
    }

    #[test]
    fn only_ht_formats_report_ht() {
        assert!(!WifiPreamble::Long.is_ht());
        assert!(!WifiPreamble::Short.is_ht());
        assert!(WifiPreamble::HtMixedFormat.is_ht());
        assert!(WifiPreamble::HtGreenfield.is_ht());
    }
}
