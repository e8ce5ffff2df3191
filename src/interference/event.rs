use embassy_time::{Duration, Instant};

use super::types::{AntennaMode, AntennaPowers, EventId};
use crate::phy::{TxVector, WifiMode, WifiPreamble};

/// One signal arriving at the receiver.
///
/// Created by [`InterferenceHelper::add_event`](super::InterferenceHelper::add_event)
/// and immutable afterwards. Cheap to clone; the ledger only keeps its id.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceptionEvent {
    id: EventId,
    size: u32,
    payload_mode: WifiMode,
    preamble: WifiPreamble,
    start_time: Instant,
    end_time: Instant,
    rx_power_w: AntennaPowers,
    tx_vector: TxVector,
}

impl ReceptionEvent {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: EventId,
        size: u32,
        payload_mode: WifiMode,
        preamble: WifiPreamble,
        start_time: Instant,
        duration: Duration,
        rx_power_w: AntennaPowers,
        tx_vector: TxVector,
    ) -> Self {
        Self {
            id,
            size,
            payload_mode,
            preamble,
            start_time,
            end_time: start_time + duration,
            rx_power_w,
            tx_vector,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn payload_mode(&self) -> WifiMode {
        self.payload_mode
    }

    pub fn preamble(&self) -> WifiPreamble {
        self.preamble
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    pub fn end_time(&self) -> Instant {
        self.end_time
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Received power (W) on antenna configuration `mode`.
    pub fn rx_power_w(&self, mode: AntennaMode) -> f64 {
        self.rx_power_w[mode]
    }

    pub fn all_rx_power_w(&self) -> AntennaPowers {
        self.rx_power_w
    }

    pub fn tx_vector(&self) -> &TxVector {
        &self.tx_vector
    }
}
