//! Active receive antenna configuration.
//!
//! The helper owns an [`AntennaModeTracker`]; an [`AntennaModel`] pushes
//! mode changes into it through an [`AntennaListener`] holding only a weak
//! reference. Once the tracker's owner is dropped the listener goes dead and
//! the model prunes it on the next notification.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use super::types::AntennaMode;

#[derive(Debug, Clone, Default)]
pub struct AntennaModeTracker {
    mode: Rc<Cell<AntennaMode>>,
}

impl AntennaModeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> AntennaMode {
        self.mode.get()
    }

    pub fn set(&self, mode: AntennaMode) {
        self.mode.set(mode);
    }

    pub fn listener(&self) -> AntennaListener {
        AntennaListener {
            target: Rc::downgrade(&self.mode),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AntennaListener {
    target: Weak<Cell<AntennaMode>>,
}

impl AntennaListener {
    /// Forward a mode change. Returns `false` once the tracker is gone.
    pub fn notify_change_antenna_mode(&self, mode: AntennaMode) -> bool {
        match self.target.upgrade() {
            Some(cell) => {
                cell.set(mode);
                true
            }
            None => false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }
}

/// Receiver antenna with selectable configurations and per-configuration gain.
#[derive(Debug, Default)]
pub struct AntennaModel {
    mode: AntennaMode,
    gains_db: Vec<f64>,
    listeners: Vec<AntennaListener>,
}

impl AntennaModel {
    pub fn new(gains_db: Vec<f64>) -> Self {
        Self {
            mode: AntennaMode::default(),
            gains_db,
            listeners: Vec::new(),
        }
    }

    pub fn mode(&self) -> AntennaMode {
        self.mode
    }

    /// Receive gain per configuration in dB.
    pub fn gains_db(&self) -> &[f64] {
        &self.gains_db
    }

    /// Register `listener` and bring it up to date with the current mode.
    pub fn register_listener(&mut self, listener: AntennaListener) {
        if listener.notify_change_antenna_mode(self.mode) {
            self.listeners.push(listener);
        }
    }

    pub fn set_mode(&mut self, mode: AntennaMode) {
        log::debug!("Antenna mode {} -> {}", self.mode, mode);
        self.mode = mode;
        self.listeners.retain(|listener| listener.notify_change_antenna_mode(mode));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_syncs_current_mode() {
        let mut model = AntennaModel::new(vec![0.0, 3.0]);
        model.set_mode(AntennaMode(1));
        let tracker = AntennaModeTracker::new();
        assert_eq!(tracker.get(), AntennaMode(0));

        model.register_listener(tracker.listener());
        assert_eq!(tracker.get(), AntennaMode(1));

        model.set_mode(AntennaMode(3));
        assert_eq!(tracker.get(), AntennaMode(3));
    }

    #[test]
    fn dropped_tracker_is_pruned() {
        let mut model = AntennaModel::default();
        let tracker = AntennaModeTracker::new();
        let listener = tracker.listener();
        model.register_listener(listener.clone());
        assert_eq!(model.listener_count(), 1);

        drop(tracker);
        assert!(!listener.is_alive());
        model.set_mode(AntennaMode(2));
        assert_eq!(model.listener_count(), 0);
    }

    #[test]
    fn clones_share_the_same_mode() {
        let tracker = AntennaModeTracker::new();
        let view = tracker.clone();
        tracker.set(AntennaMode(4));
        assert_eq!(view.get(), AntennaMode(4));
    }
}
