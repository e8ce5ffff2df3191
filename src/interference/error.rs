use thiserror::Error;

use super::types::EventId;

/// Precondition failures reported by the interference core.
///
/// Ledger invariant violations are programming errors and are checked with
/// debug assertions instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterferenceError {
    #[error("no error rate model configured")]
    MissingErrorRateModel,

    #[error("event {0} has no records left in the interference ledger")]
    UnknownEvent(EventId),

    #[error("antenna mode {index} out of range (0..{count})")]
    InvalidAntennaMode { index: usize, count: usize },
}
