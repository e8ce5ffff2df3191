use embassy_time::{Duration, Instant};
use std::rc::Rc;

use super::antenna::{AntennaModeTracker, AntennaModel};
use super::error::InterferenceError;
use super::event::ReceptionEvent;
use super::ledger::InterferenceLedger;
use super::types::{AntennaMode, AntennaPowers, EventId, SnrPer};
use crate::phy::error_rate::ErrorRateModel;
use crate::phy::timing::{DefaultPhyTiming, PhyTiming};
use crate::phy::{TxVector, WifiMode, WifiPreamble};
use crate::signal_calculations::thermal_noise_w;

/// One point of the interference profile seen by a reception.
#[derive(Debug, Clone, Copy, PartialEq)]
struct WindowEntry {
    time: Instant,
    delta: f64,
}

/// Sub-field boundaries of one frame.
struct FrameLayout {
    header_start: Instant,
    ht_sig_start: Instant,
    training_start: Instant,
    payload_start: Instant,
    legacy_header_mode: WifiMode,
    ht_header_mode: WifiMode,
    payload_mode: WifiMode,
}

impl FrameLayout {
    /// Decodable sections as `(from, to, mode)`. Preamble and HT training
    /// symbols are not decoded and have no entry.
    fn sections(&self) -> [(Instant, Instant, WifiMode); 3] {
        [
            (self.header_start, self.ht_sig_start, self.legacy_header_mode),
            (self.ht_sig_start, self.training_start, self.ht_header_mode),
            (self.payload_start, Instant::MAX, self.payload_mode),
        ]
    }
}

/// Tracks every signal at one receiver and evaluates receptions against it.
pub struct InterferenceHelper {
    ledger: InterferenceLedger,
    error_rate_model: Option<Rc<dyn ErrorRateModel>>,
    phy_timing: Box<dyn PhyTiming>,
    noise_figure: f64,
    rxing: bool,
    antenna: AntennaModeTracker,
    next_event_id: u64,
}

impl Default for InterferenceHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl InterferenceHelper {
    pub fn new() -> Self {
        Self::with_phy_timing(DefaultPhyTiming)
    }

    pub fn with_phy_timing(phy_timing: impl PhyTiming + 'static) -> Self {
        Self {
            ledger: InterferenceLedger::new(),
            error_rate_model: None,
            phy_timing: Box::new(phy_timing),
            noise_figure: 1.0,
            rxing: false,
            antenna: AntennaModeTracker::new(),
            next_event_id: 0,
        }
    }

    /// Linear noise figure applied on top of thermal noise.
    pub fn set_noise_figure(&mut self, value: f64) {
        self.noise_figure = value;
    }

    pub fn noise_figure(&self) -> f64 {
        self.noise_figure
    }

    pub fn set_error_rate_model(&mut self, model: Rc<dyn ErrorRateModel>) {
        self.error_rate_model = Some(model);
    }

    pub fn error_rate_model(&self) -> Option<Rc<dyn ErrorRateModel>> {
        self.error_rate_model.clone()
    }

    /// Follow the mode of `antenna` from now on, starting with its current mode.
    pub fn setup_antenna_listener(&self, antenna: &mut AntennaModel) {
        antenna.register_listener(self.antenna.listener());
    }

    pub fn notify_change_antenna_mode(&self, mode: AntennaMode) {
        self.antenna.set(mode);
    }

    pub fn antenna_mode(&self) -> AntennaMode {
        self.antenna.get()
    }

    pub fn notify_rx_start(&mut self) {
        self.rxing = true;
    }

    pub fn notify_rx_end(&mut self) {
        self.rxing = false;
    }

    pub fn is_receiving(&self) -> bool {
        self.rxing
    }

    pub fn ledger(&self) -> &InterferenceLedger {
        &self.ledger
    }

    /// Power already folded out of the ledger on the active configuration.
    pub fn baseline_power_w(&self) -> f64 {
        self.ledger.baseline()[self.antenna.get()]
    }

    /// Total received power on the active configuration at `time`.
    pub fn power_at(&self, time: Instant) -> f64 {
        self.ledger.power_at(time)[self.antenna.get()]
    }

    /// Drop every tracked signal.
    pub fn clear(&mut self) {
        self.ledger.clear();
    }

    /// Register a signal that starts now.
    pub fn add_event(
        &mut self,
        size: u32,
        payload_mode: WifiMode,
        preamble: WifiPreamble,
        duration: Duration,
        rx_power_w: AntennaPowers,
        tx_vector: TxVector,
    ) -> ReceptionEvent {
        self.add_event_at(Instant::now(), size, payload_mode, preamble, duration, rx_power_w, tx_vector)
    }

    /// Register a signal starting at `start`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_event_at(
        &mut self,
        start: Instant,
        size: u32,
        payload_mode: WifiMode,
        preamble: WifiPreamble,
        duration: Duration,
        rx_power_w: AntennaPowers,
        tx_vector: TxVector,
    ) -> ReceptionEvent {
        let id = EventId(self.next_event_id);
        self.next_event_id += 1;
        let event = ReceptionEvent::new(id, size, payload_mode, preamble, start, duration, rx_power_w, tx_vector);
        self.ledger.append_event(&event);
        log::trace!(
            "Added event {} [{}us, {}us) {} {:e} W",
            id,
            event.start_time().as_micros(),
            event.end_time().as_micros(),
            payload_mode.name(),
            event.rx_power_w(self.antenna.get())
        );
        event
    }

    /// Time from now until the received power drops below `threshold_w`.
    pub fn energy_duration(&self, threshold_w: f64) -> Duration {
        self.energy_duration_at(Instant::now(), threshold_w)
    }

    /// Time from `now` until the received power drops below `threshold_w`.
    ///
    /// Zero if it already is below. If it never drops below within the
    /// tracked signals, the time until the last tracked change.
    pub fn energy_duration_at(&self, now: Instant, threshold_w: f64) -> Duration {
        let mode = self.antenna.get();
        let split = self.ledger.position_after(now);
        let mut power = self.ledger.baseline()[mode] + self.ledger.records().take(split).map(|r| r.delta(mode)).sum::<f64>();
        if power < threshold_w {
            return Duration::from_ticks(0);
        }

        let mut last = now;
        let mut upcoming = self.ledger.records().skip(split).peekable();
        while let Some(change) = upcoming.next() {
            power += change.delta(mode);
            last = change.time();
            if upcoming.peek().is_some_and(|next| next.time() == last) {
                continue;
            }
            if power < threshold_w {
                break;
            }
        }
        last - now
    }

    /// Evaluate a reception: SNR at its start and PER over its whole duration.
    ///
    /// Consumes the interference history up to the end of `event` (except what
    /// other receptions still on air need), so receptions must be evaluated in
    /// end-time order, and each one only once.
    pub fn calculate_snr_per(&mut self, event: &ReceptionEvent) -> Result<SnrPer, InterferenceError> {
        let model = self.error_rate_model.clone().ok_or(InterferenceError::MissingErrorRateModel)?;
        if self.ledger.locate_event_end(event.id()).is_none() {
            return Err(InterferenceError::UnknownEvent(event.id()));
        }
        let mode = self.antenna.get();

        let staged = self.ledger.stage_boundary_splits(event.id(), &[event.start_time(), event.end_time()]);
        if !staged.is_empty() {
            log::debug!("Event {}: splitting {} records at its boundaries", event.id(), staged.len());
        }
        self.ledger.merge_staged(staged);

        if let Some(start) = self.ledger.locate_event_start(event.id()) {
            self.compact_up_to(event, start);
        }
        self.ledger.log_records(mode);

        let (window, interference_at_start) = self.collect_window(event, mode);
        let signal = event.rx_power_w(mode);
        let noise = thermal_noise_w(event.payload_mode().bandwidth_hz()) * self.noise_figure;
        let snr = signal / (noise + interference_at_start);
        let per = self.integrate_per(event, &window, signal, noise, &*model);

        self.ledger.retire(event.id());
        if let Some(end) = self.ledger.locate_event_end(event.id()) {
            self.compact_up_to(event, end + 1);
        }

        log::debug!("Event {}: snr={:.3} per={:.6} ({} window entries)", event.id(), snr, per, window.len());
        Ok(SnrPer {
            snr,
            per,
            interference_w: interference_at_start,
        })
    }

    /// Fold records before `upto`, stopping at the oldest record another
    /// reception still on air depends on.
    ///
    /// Signals that are never evaluated count as on air until they end, so a
    /// long interferer holds its history (and everything after it) in the
    /// ledger until its end time passes.
    fn compact_up_to(&mut self, event: &ReceptionEvent, upto: usize) {
        let upto = match self.ledger.in_flight_floor(event.id(), event.end_time()) {
            Some(floor) => floor.min(upto),
            None => upto,
        };
        self.ledger.compact(upto);
    }

    /// Interference profile over `[start, end]` of `event`, excluding its own power.
    ///
    /// The first entry carries the absolute interference at the start, every
    /// other entry a signed change. Also returns the interference at the start.
    fn collect_window(&self, event: &ReceptionEvent, mode: AntennaMode) -> (Vec<WindowEntry>, f64) {
        let (start, end) = (event.start_time(), event.end_time());

        // Own records folded into the baseline are cancelled by the retained ones
        let mut level = self.ledger.baseline()[mode];
        let mut inside = Vec::new();
        for change in self.ledger.records() {
            if change.owner() == event.id() || change.time() <= start {
                level += change.delta(mode);
            } else if change.time() < end {
                inside.push(WindowEntry {
                    time: change.time(),
                    delta: change.delta(mode),
                });
            }
        }

        let mut window = Vec::with_capacity(inside.len() + 2);
        window.push(WindowEntry { time: start, delta: level });
        window.extend(inside);
        window.push(WindowEntry { time: end, delta: 0.0 });
        (window, level)
    }

    fn frame_layout(&self, event: &ReceptionEvent) -> FrameLayout {
        let timing = &*self.phy_timing;
        let (mode, preamble) = (event.payload_mode(), event.preamble());

        let header_start = event.start_time() + timing.preamble_duration(&mode, preamble);
        let ht_sig_start = header_start + timing.header_duration(&mode, preamble);
        let training_start = ht_sig_start + timing.ht_sig_duration(&mode, preamble);
        let payload_start = training_start + timing.ht_training_duration(&mode, preamble, event.tx_vector());

        let legacy_header_mode = if preamble.is_ht() {
            timing.mixed_format_header_mode(&mode, preamble)
        } else {
            timing.header_mode(&mode, preamble)
        };
        FrameLayout {
            header_start,
            ht_sig_start,
            training_start,
            payload_start,
            legacy_header_mode,
            ht_header_mode: timing.header_mode(&mode, preamble),
            payload_mode: mode,
        }
    }

    /// PER = 1 - Π chunk success over every constant-interference slice of
    /// every decodable section.
    fn integrate_per(&self, event: &ReceptionEvent, window: &[WindowEntry], signal: f64, noise: f64, model: &dyn ErrorRateModel) -> f64 {
        let layout = self.frame_layout(event);
        let Some((first, rest)) = window.split_first() else {
            return 0.0;
        };

        let mut success = 1.0;
        let mut interference = first.delta;
        let mut previous = first.time;
        for entry in rest {
            let current = entry.time;
            let snr = signal / (noise + interference);
            for (from, to, mode) in layout.sections() {
                let slice_start = previous.max(from);
                let slice_end = current.min(to);
                if slice_end > slice_start {
                    let factor = chunk_success_rate(model, &mode, snr, slice_end - slice_start);
                    log::trace!(
                        "Event {}: [{}us, {}us) {} snr={:.3} success={:.6}",
                        event.id(),
                        slice_start.as_micros(),
                        slice_end.as_micros(),
                        mode.name(),
                        snr,
                        factor
                    );
                    success *= factor;
                }
            }
            interference += entry.delta;
            previous = current;
        }
        (1.0 - success).clamp(0.0, 1.0)
    }
}

/// Success probability of one chunk sent with `mode` at constant `snr`.
fn chunk_success_rate(model: &dyn ErrorRateModel, mode: &WifiMode, snr: f64, duration: Duration) -> f64 {
    if duration.as_ticks() == 0 {
        return 1.0;
    }
    let bits = u128::from(mode.phy_rate_bps()) * u128::from(duration.as_ticks()) / u128::from(embassy_time::TICK_HZ);
    model.chunk_success_rate(mode, snr, u32::try_from(bits).unwrap_or(u32::MAX))
}
