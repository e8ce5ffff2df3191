//! Time-ordered ledger of interference power changes.
//!
//! Every signal contributes a positive record at its start and a negative
//! record at its end. Power at time `t` on configuration `A` is
//!
//! ```text
//! baseline[A] + Σ delta[A] over every record with time <= t
//! ```
//!
//! Records older than any pending computation are folded into `baseline` and
//! dropped, so the ledger only spans the receptions still in flight.
//!
//! Records are keyed by `(time, seq)`, `seq` growing with every insertion:
//! sorting by key is sorting by time with insertion order breaking ties. Keys
//! never change, so a record can point at its partner (start ↔ end, or the
//! halves produced by a boundary split) without positions going stale.

use embassy_time::Instant;
use std::collections::{HashMap, VecDeque};

use super::event::ReceptionEvent;
use super::types::{AntennaMode, AntennaPowers, EventId};

/// Stable identity of a ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordKey {
    time: Instant,
    seq: u64,
}

impl RecordKey {
    pub fn time(&self) -> Instant {
        self.time
    }
}

/// Role of a record within its owner's power profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Signal starts, positive delta.
    Start,
    /// Signal ends, negative delta.
    End,
    /// First half of a split segment ends here, negative delta.
    SplitClose,
    /// Second half of a split segment starts here, positive delta.
    SplitReopen,
}

impl Edge {
    /// Whether the record opens a segment (adds its owner's power).
    pub fn opens(self) -> bool {
        matches!(self, Edge::Start | Edge::SplitReopen)
    }
}

/// A signed change of interference power ("NiChange").
#[derive(Debug, Clone, PartialEq)]
pub struct NiChange {
    key: RecordKey,
    delta: AntennaPowers,
    owner: EventId,
    edge: Edge,
    pair: Option<RecordKey>,
}

impl NiChange {
    pub fn key(&self) -> RecordKey {
        self.key
    }

    pub fn time(&self) -> Instant {
        self.key.time
    }

    pub fn delta(&self, mode: AntennaMode) -> f64 {
        self.delta[mode]
    }

    pub fn deltas(&self) -> AntennaPowers {
        self.delta
    }

    pub fn owner(&self) -> EventId {
        self.owner
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    /// Key of the record closing (or opening) the same segment.
    pub fn pair(&self) -> Option<RecordKey> {
        self.pair
    }
}

#[derive(Debug, Clone, Copy)]
struct EventSpan {
    start: RecordKey,
    end: RecordKey,
    resolved: bool,
}

/// Split records computed against a snapshot of the ledger, merged in one pass.
#[derive(Debug, Default)]
pub struct StagedSplits {
    inserts: Vec<NiChange>,
    relinks: Vec<(RecordKey, RecordKey)>,
}

impl StagedSplits {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty()
    }

    /// Number of records waiting to be merged.
    pub fn len(&self) -> usize {
        self.inserts.len()
    }
}

#[derive(Debug, Default)]
pub struct InterferenceLedger {
    records: VecDeque<NiChange>,
    baseline: AntennaPowers,
    next_seq: u64,
    spans: HashMap<EventId, EventSpan>,
}

impl InterferenceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &NiChange> {
        self.records.iter()
    }

    pub fn get(&self, index: usize) -> Option<&NiChange> {
        self.records.get(index)
    }

    /// Power already folded out of the retained records ("first power").
    pub fn baseline(&self) -> AntennaPowers {
        self.baseline
    }

    fn next_key(&mut self, time: Instant) -> RecordKey {
        let key = RecordKey { time, seq: self.next_seq };
        self.next_seq += 1;
        key
    }

    fn index_of(&self, key: RecordKey) -> Option<usize> {
        self.records.binary_search_by(|record| record.key.cmp(&key)).ok()
    }

    fn set_pair(&mut self, key: RecordKey, pair: RecordKey) {
        match self.index_of(key) {
            Some(index) => self.records[index].pair = Some(pair),
            None => debug_assert!(false, "relinking a record that is not in the ledger"),
        }
    }

    /// Index of the first record strictly later than `time` (upper bound).
    pub fn position_after(&self, time: Instant) -> usize {
        self.records.partition_point(|record| record.time() <= time)
    }

    /// Insert a record at its sorted position, after every record sharing its timestamp.
    pub fn insert(&mut self, time: Instant, delta: AntennaPowers, owner: EventId, edge: Edge) -> RecordKey {
        let key = self.next_key(time);
        let position = self.position_after(time);
        self.records.insert(
            position,
            NiChange {
                key,
                delta,
                owner,
                edge,
                pair: None,
            },
        );
        key
    }

    /// Record the arrival and departure of `event`.
    ///
    /// The only way new interference enters the ledger.
    pub fn append_event(&mut self, event: &ReceptionEvent) {
        let power = event.all_rx_power_w();
        let start = self.insert(event.start_time(), power, event.id(), Edge::Start);
        let end = self.insert(event.end_time(), -power, event.id(), Edge::End);
        self.set_pair(start, end);
        self.set_pair(end, start);
        self.spans.insert(event.id(), EventSpan { start, end, resolved: false });
        debug_assert!(self.is_sorted(), "ledger out of order after appending {}", event.id());
    }

    /// Position of the record that started event `id`, if it is still retained.
    pub fn locate_event_start(&self, id: EventId) -> Option<usize> {
        self.spans.get(&id).and_then(|span| self.index_of(span.start))
    }

    /// Position of the record that ends event `id`, if it is still retained.
    pub fn locate_event_end(&self, id: EventId) -> Option<usize> {
        self.spans.get(&id).and_then(|span| self.index_of(span.end))
    }

    /// Follow the back-reference of the record at `index`.
    pub fn pair_of(&self, index: usize) -> Option<usize> {
        self.records.get(index)?.pair.and_then(|key| self.index_of(key))
    }

    /// Fold every record before position `upto` into the baseline and erase them.
    pub fn compact(&mut self, upto: usize) {
        let upto = upto.min(self.records.len());
        if upto == 0 {
            return;
        }
        for change in self.records.drain(..upto) {
            self.baseline += change.delta;
        }
        // Forget events whose records are all gone
        match self.records.front().map(NiChange::key) {
            Some(first) => self.spans.retain(|_, span| span.end >= first),
            None => self.spans.clear(),
        }
    }

    /// Total power on every configuration at `time`.
    pub fn power_at(&self, time: Instant) -> AntennaPowers {
        let mut power = self.baseline;
        for change in self.records.iter().take_while(|record| record.time() <= time) {
            power += change.delta;
        }
        power
    }

    /// Drop every record and reset the baseline.
    pub fn clear(&mut self) {
        self.records.clear();
        self.spans.clear();
        self.baseline = AntennaPowers::ZERO;
    }

    /// Mark `id` as evaluated; it no longer holds back compaction.
    pub fn retire(&mut self, id: EventId) {
        if let Some(span) = self.spans.get_mut(&id) {
            span.resolved = true;
        }
    }

    /// Earliest retained record of any unresolved event other than `exclude`
    /// that is still on air at `horizon`.
    ///
    /// Compaction must stop there: those events will be evaluated later and
    /// need the interference history from their own start onwards.
    pub fn in_flight_floor(&self, exclude: EventId, horizon: Instant) -> Option<usize> {
        self.spans
            .iter()
            .filter(|(id, span)| **id != exclude && !span.resolved && span.end.time >= horizon)
            .filter_map(|(id, span)| self.index_of(span.start).or_else(|| self.records.iter().position(|r| r.owner == *id)))
            .min()
    }

    /// Compute the records needed so that no segment of another event
    /// crosses any of `boundaries`.
    ///
    /// A segment (opening record + its pair) that strictly contains a
    /// boundary is closed at the boundary and reopened at the same instant.
    /// The two new records cancel out, so the power at every instant is
    /// unchanged while each half can be folded or kept on its own.
    pub fn stage_boundary_splits(&mut self, exclude: EventId, boundaries: &[Instant]) -> StagedSplits {
        let segments: Vec<(RecordKey, RecordKey, AntennaPowers, EventId)> = self
            .records
            .iter()
            .filter(|record| record.owner != exclude && record.edge.opens())
            .filter_map(|record| record.pair.map(|close| (record.key, close, record.delta, record.owner)))
            .collect();

        let mut boundaries = boundaries.to_vec();
        boundaries.sort();
        boundaries.dedup();

        let mut staged = StagedSplits::default();
        for (open, close, delta, owner) in segments {
            let mut previous_open = open;
            for &boundary in boundaries.iter().filter(|b| open.time < **b && **b < close.time) {
                let close_key = self.next_key(boundary);
                let reopen_key = self.next_key(boundary);
                staged.inserts.push(NiChange {
                    key: close_key,
                    delta: -delta,
                    owner,
                    edge: Edge::SplitClose,
                    pair: Some(previous_open),
                });
                staged.inserts.push(NiChange {
                    key: reopen_key,
                    delta,
                    owner,
                    edge: Edge::SplitReopen,
                    pair: None,
                });
                staged.relinks.push((previous_open, close_key));
                previous_open = reopen_key;
            }
            if previous_open != open {
                staged.relinks.push((previous_open, close));
                staged.relinks.push((close, previous_open));
            }
        }
        staged
    }

    /// Merge staged split records into the ledger in a single ordered pass.
    pub fn merge_staged(&mut self, staged: StagedSplits) {
        let StagedSplits { mut inserts, relinks } = staged;
        if inserts.is_empty() {
            return;
        }
        inserts.sort_by_key(|change| change.key);

        let mut merged = VecDeque::with_capacity(self.records.len() + inserts.len());
        let mut existing = std::mem::take(&mut self.records).into_iter().peekable();
        let mut incoming = inserts.into_iter().peekable();
        loop {
            let take_existing = match (existing.peek(), incoming.peek()) {
                (Some(current), Some(new)) => current.key < new.key,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_existing { existing.next() } else { incoming.next() };
            merged.extend(next);
        }
        self.records = merged;

        for (key, pair) in relinks {
            self.set_pair(key, pair);
        }
        debug_assert!(self.is_sorted(), "ledger out of order after merging splits");
    }

    fn is_sorted(&self) -> bool {
        self.records.iter().zip(self.records.iter().skip(1)).all(|(a, b)| a.key < b.key)
    }

    /// Dump the retained records at trace level.
    pub fn log_records(&self, mode: AntennaMode) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        log::trace!("baseline={:e} W, {} records", self.baseline[mode], self.records.len());
        for change in &self.records {
            log::trace!(
                "  t={}us delta={:e} W owner={} {:?}",
                change.time().as_micros(),
                change.delta[mode],
                change.owner,
                change.edge
            );
        }
    }
}
