//! PLCP timing constants.
//!
//! The interference core only needs to know where each PLCP field begins and
//! which mode demodulates it. Those answers sit behind [`PhyTiming`] so a
//! caller can plug in a different standard; [`DefaultPhyTiming`] carries the
//! 802.11a/b/g/n values.
//!
//! Field order on air: preamble, legacy header (PLCP header / L-SIG), HT-SIG,
//! HT training symbols, payload. Fields a format lacks have zero duration.

use embassy_time::Duration;

use super::{DSSS_RATE_1MBPS, DSSS_RATE_2MBPS, HT_MCS0, ModulationClass, OFDM_RATE_1_5MBPS_BW5MHZ, OFDM_RATE_3MBPS_BW10MHZ, OFDM_RATE_6MBPS};
use super::{TxVector, WifiMode, WifiPreamble};

/// Pure lookup of PLCP field durations and header modes.
pub trait PhyTiming {
    /// Duration of the training preamble (STF + LTF, or the DSSS sync field).
    fn preamble_duration(&self, payload_mode: &WifiMode, preamble: WifiPreamble) -> Duration;

    /// Duration of the legacy header: PLCP header for DSSS/OFDM, L-SIG for HT mixed format.
    fn header_duration(&self, payload_mode: &WifiMode, preamble: WifiPreamble) -> Duration;

    /// Duration of HT-SIG. Zero for legacy formats.
    fn ht_sig_duration(&self, payload_mode: &WifiMode, preamble: WifiPreamble) -> Duration;

    /// Duration of the HT training symbols following HT-SIG. Zero for legacy formats.
    fn ht_training_duration(&self, payload_mode: &WifiMode, preamble: WifiPreamble, tx_vector: &TxVector) -> Duration;

    /// Mode used to demodulate the PLCP header (HT-SIG for HT formats).
    fn header_mode(&self, payload_mode: &WifiMode, preamble: WifiPreamble) -> WifiMode;

    /// Mode used to demodulate the L-SIG of an HT mixed format frame.
    fn mixed_format_header_mode(&self, payload_mode: &WifiMode, preamble: WifiPreamble) -> WifiMode;
}

/// 802.11a/b/g/n PLCP timings.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPhyTiming;

/// Number of HT-LTFs needed for `nss` spatial streams.
fn data_ltf_count(nss: u8) -> u64 {
    match nss {
        0 | 1 => 1,
        2 => 2,
        _ => 4,
    }
}

/// Number of extension HT-LTFs needed for `ness` extension streams.
fn extension_ltf_count(ness: u8) -> u64 {
    match ness {
        0 => 0,
        1 => 1,
        2 => 2,
        _ => 4,
    }
}

impl PhyTiming for DefaultPhyTiming {
    fn preamble_duration(&self, payload_mode: &WifiMode, preamble: WifiPreamble) -> Duration {
        let micros = match payload_mode.class() {
            ModulationClass::Dsss => match preamble {
                WifiPreamble::Short => 72,
                _ => 144,
            },
            ModulationClass::Ofdm => match payload_mode.bandwidth_hz() {
                5_000_000 => 64,
                10_000_000 => 32,
                _ => 16,
            },
            // L-STF + L-LTF for mixed format, HT-STF + HT-LTF1 for greenfield
            ModulationClass::Ht => 16,
        };
        Duration::from_micros(micros)
    }

    fn header_duration(&self, payload_mode: &WifiMode, preamble: WifiPreamble) -> Duration {
        let micros = match payload_mode.class() {
            ModulationClass::Dsss => match preamble {
                WifiPreamble::Short => 24,
                _ => 48,
            },
            ModulationClass::Ofdm => match payload_mode.bandwidth_hz() {
                5_000_000 => 16,
                10_000_000 => 8,
                _ => 4,
            },
            ModulationClass::Ht => match preamble {
                WifiPreamble::HtGreenfield => 0,
                _ => 4,
            },
        };
        Duration::from_micros(micros)
    }

    fn ht_sig_duration(&self, _payload_mode: &WifiMode, preamble: WifiPreamble) -> Duration {
        if preamble.is_ht() { Duration::from_micros(8) } else { Duration::from_micros(0) }
    }

    fn ht_training_duration(&self, _payload_mode: &WifiMode, preamble: WifiPreamble, tx_vector: &TxVector) -> Duration {
        let ltfs = data_ltf_count(tx_vector.nss) + extension_ltf_count(tx_vector.ness);
        let micros = match preamble {
            // HT-STF followed by every HT-LTF
            WifiPreamble::HtMixedFormat => 4 + 4 * ltfs,
            // HT-LTF1 already went out with the preamble
            WifiPreamble::HtGreenfield => 4 * (ltfs - 1),
            WifiPreamble::Long | WifiPreamble::Short => 0,
        };
        Duration::from_micros(micros)
    }

    fn header_mode(&self, payload_mode: &WifiMode, preamble: WifiPreamble) -> WifiMode {
        match payload_mode.class() {
            ModulationClass::Dsss => match preamble {
                WifiPreamble::Short => DSSS_RATE_2MBPS,
                _ => DSSS_RATE_1MBPS,
            },
            ModulationClass::Ofdm => legacy_ofdm_header_mode(payload_mode.bandwidth_hz()),
            ModulationClass::Ht if preamble.is_ht() => HT_MCS0,
            ModulationClass::Ht => OFDM_RATE_6MBPS,
        }
    }

    fn mixed_format_header_mode(&self, payload_mode: &WifiMode, _preamble: WifiPreamble) -> WifiMode {
        legacy_ofdm_header_mode(payload_mode.bandwidth_hz())
    }
}

fn legacy_ofdm_header_mode(bandwidth_hz: u32) -> WifiMode {
    match bandwidth_hz {
        5_000_000 => OFDM_RATE_1_5MBPS_BW5MHZ,
        10_000_000 => OFDM_RATE_3MBPS_BW10MHZ,
        _ => OFDM_RATE_6MBPS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::{DSSS_RATE_11MBPS, HT_MCS7, OFDM_RATE_54MBPS};

    fn micros(d: Duration) -> u64 {
        d.as_micros()
    }

    #[test]
    fn legacy_formats_have_no_ht_fields() {
        let timing = DefaultPhyTiming;
        for (mode, preamble) in [(OFDM_RATE_54MBPS, WifiPreamble::Long), (DSSS_RATE_11MBPS, WifiPreamble::Short)] {
            let tx = TxVector::new(mode);
            assert_eq!(micros(timing.ht_sig_duration(&mode, preamble)), 0);
            assert_eq!(micros(timing.ht_training_duration(&mode, preamble, &tx)), 0);
        }
    }

    #[test]
    fn dsss_preamble_and_header_depend_on_preamble_length() {
        let timing = DefaultPhyTiming;
        assert_eq!(micros(timing.preamble_duration(&DSSS_RATE_11MBPS, WifiPreamble::Long)), 144);
        assert_eq!(micros(timing.header_duration(&DSSS_RATE_11MBPS, WifiPreamble::Long)), 48);
        assert_eq!(micros(timing.preamble_duration(&DSSS_RATE_11MBPS, WifiPreamble::Short)), 72);
        assert_eq!(micros(timing.header_duration(&DSSS_RATE_11MBPS, WifiPreamble::Short)), 24);
        assert_eq!(timing.header_mode(&DSSS_RATE_11MBPS, WifiPreamble::Long), DSSS_RATE_1MBPS);
        assert_eq!(timing.header_mode(&DSSS_RATE_11MBPS, WifiPreamble::Short), DSSS_RATE_2MBPS);
    }

    #[test]
    fn ofdm_timings_scale_with_channel_width() {
        let timing = DefaultPhyTiming;
        assert_eq!(micros(timing.preamble_duration(&OFDM_RATE_54MBPS, WifiPreamble::Long)), 16);
        assert_eq!(micros(timing.header_duration(&OFDM_RATE_54MBPS, WifiPreamble::Long)), 4);
        assert_eq!(micros(timing.preamble_duration(&OFDM_RATE_3MBPS_BW10MHZ, WifiPreamble::Long)), 32);
        assert_eq!(micros(timing.header_duration(&OFDM_RATE_1_5MBPS_BW5MHZ, WifiPreamble::Long)), 16);
        assert_eq!(timing.header_mode(&OFDM_RATE_3MBPS_BW10MHZ, WifiPreamble::Long), OFDM_RATE_3MBPS_BW10MHZ);
    }

    #[test]
    fn ht_mixed_format_training_counts_streams() {
        let timing = DefaultPhyTiming;
        let one = TxVector::new(HT_MCS7);
        let two = TxVector::new(HT_MCS7).with_streams(2, 0);
        let three = TxVector::new(HT_MCS7).with_streams(3, 1);
        assert_eq!(micros(timing.ht_training_duration(&HT_MCS7, WifiPreamble::HtMixedFormat, &one)), 8);
        assert_eq!(micros(timing.ht_training_duration(&HT_MCS7, WifiPreamble::HtMixedFormat, &two)), 12);
        assert_eq!(micros(timing.ht_training_duration(&HT_MCS7, WifiPreamble::HtMixedFormat, &three)), 24);
    }

    #[test]
    fn greenfield_drops_lsig_and_first_ltf() {
        let timing = DefaultPhyTiming;
        let two = TxVector::new(HT_MCS7).with_streams(2, 0);
        assert_eq!(micros(timing.header_duration(&HT_MCS7, WifiPreamble::HtGreenfield)), 0);
        assert_eq!(micros(timing.ht_sig_duration(&HT_MCS7, WifiPreamble::HtGreenfield)), 8);
        assert_eq!(micros(timing.ht_training_duration(&HT_MCS7, WifiPreamble::HtGreenfield, &two)), 4);
        assert_eq!(timing.header_mode(&HT_MCS7, WifiPreamble::HtGreenfield), HT_MCS0);
        assert_eq!(timing.mixed_format_header_mode(&HT_MCS7, WifiPreamble::HtMixedFormat), OFDM_RATE_6MBPS);
    }
}
