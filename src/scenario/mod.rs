//! Scenario files and the runner replaying them against one receiver.

mod config;
mod runner;
mod traffic;

pub use config::{AntennaChange, BackgroundTrafficConfig, ErrorModelConfig, ScenarioConfig, TransmissionConfig};
pub use runner::{ReceptionReport, ScenarioReport, run_scenario};
pub use traffic::generate_background;
