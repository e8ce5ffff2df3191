//! Interference accounting for one receiver.
//!
//! Every signal reaching the receiver becomes a [`ReceptionEvent`] whose power
//! is recorded in the [`InterferenceLedger`] as a start/end pair of deltas.
//! [`InterferenceHelper`] owns the ledger and answers the two questions a PHY
//! asks it:
//!
//! - how likely is this reception to be decoded (`calculate_snr_per`)
//! - how long until the medium goes quiet (`energy_duration`)
//!
//! Power is tracked separately for each receive antenna configuration; the
//! active one is chosen through the [`AntennaModeTracker`] when a value is
//! computed.

mod antenna;
mod error;
mod event;
mod helper;
mod ledger;
mod types;

pub use antenna::{AntennaListener, AntennaModeTracker, AntennaModel};
pub use error::InterferenceError;
pub use event::ReceptionEvent;
pub use helper::InterferenceHelper;
pub use ledger::{Edge, InterferenceLedger, NiChange, RecordKey, StagedSplits};
pub use types::{AntennaMode, AntennaPowers, EventId, NUMBER_OF_ANTENNA_MODES, SnrPer};
