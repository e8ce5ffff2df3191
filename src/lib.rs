//! Wi-Fi reception interference accounting and packet error rate estimation,
//! driven by a discrete-event simulation clock.

pub mod interference;
pub mod phy;
pub mod scenario;
pub mod signal_calculations;
pub mod time_driver;
