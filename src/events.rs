//! Confirmed gesture events and the store they are appended to.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{debounce::Debouncer, types::Gesture};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfirmedEvent {
    pub gesture: Gesture,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EventStatistics {
    pub total: usize,
    pub unique: usize,
    pub most_detected: Option<Gesture>,
}

pub trait EventSink {
    fn append(&mut self, event: ConfirmedEvent) -> anyhow::Result<()>;
}

/// In-memory event store, oldest first.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<ConfirmedEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Every event, newest first.
    pub fn all(&self) -> Vec<ConfirmedEvent> {
        self.events.iter().rev().cloned().collect()
    }

    pub fn recent(&self, limit: usize) -> Vec<ConfirmedEvent> {
        self.events.iter().rev().take(limit).cloned().collect()
    }

    pub fn statistics(&self) -> EventStatistics {
        let mut counts: HashMap<Gesture, usize> = HashMap::new();
        for event in &self.events {
            *counts.entry(event.gesture).or_default() += 1;
        }
        summarize(&counts, self.events.len())
    }

    /// Removes every event and returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let removed = self.events.len();
        self.events.clear();
        log::info!("cleared {removed} confirmed gesture events");
        removed
    }
}

impl EventSink for EventLog {
    fn append(&mut self, event: ConfirmedEvent) -> anyhow::Result<()> {
        self.events.push(event);
        Ok(())
    }
}

/// Per-gesture counters for long runs where only the statistics matter.
#[derive(Clone, Debug, Default)]
pub struct EventTally {
    counts: HashMap<Gesture, usize>,
    total: usize,
}

impl EventTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, gesture: Gesture) -> usize {
        self.counts.get(&gesture).copied().unwrap_or(0)
    }

    pub fn statistics(&self) -> EventStatistics {
        summarize(&self.counts, self.total)
    }
}

impl EventSink for EventTally {
    fn append(&mut self, event: ConfirmedEvent) -> anyhow::Result<()> {
        *self.counts.entry(event.gesture).or_default() += 1;
        self.total += 1;
        Ok(())
    }
}

fn summarize(counts: &HashMap<Gesture, usize>, total: usize) -> EventStatistics {
    // Ties go to the gesture that comes first in the vocabulary.
    let most_detected = counts
        .iter()
        .max_by(|(ga, ca), (gb, cb)| ca.cmp(cb).then_with(|| gb.cmp(ga)))
        .map(|(gesture, _)| *gesture);

    EventStatistics {
        total,
        unique: counts.len(),
        most_detected,
    }
}

/// Debounces per-frame labels and appends each confirmed gesture to a sink.
pub struct EventRecorder<S: EventSink> {
    debouncer: Debouncer,
    sink: S,
    confidence: f32,
}

impl<S: EventSink> EventRecorder<S> {
    pub fn new(debouncer: Debouncer, sink: S, confidence: f32) -> Self {
        Self {
            debouncer,
            sink,
            confidence,
        }
    }

    pub fn observe(&mut self, label: Option<Gesture>) -> Option<ConfirmedEvent> {
        let gesture = self.debouncer.observe(label)?;
        let event = ConfirmedEvent {
            gesture,
            confidence: self.confidence,
            timestamp: Utc::now(),
        };

        log::info!("confirmed gesture {gesture} ({})", gesture.description());
        if let Err(err) = self.sink.append(event.clone()) {
            log::warn!("failed to record confirmed gesture {gesture}: {err:?}");
        }
        Some(event)
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::types::Gesture::{Good, Hello, Stop, Yes};

    fn event(gesture: Gesture) -> ConfirmedEvent {
        ConfirmedEvent {
            gesture,
            confidence: 0.9,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn queries_return_newest_first() {
        let mut log = EventLog::new();
        for gesture in [Yes, Hello, Good] {
            log.append(event(gesture)).unwrap();
        }

        let all: Vec<_> = log.all().into_iter().map(|e| e.gesture).collect();
        assert_eq!(all, vec![Good, Hello, Yes]);

        let recent: Vec<_> = log.recent(2).into_iter().map(|e| e.gesture).collect();
        assert_eq!(recent, vec![Good, Hello]);
        assert_eq!(log.recent(10).len(), 3);
    }

    #[test]
    fn statistics_count_and_break_ties_by_vocabulary() {
        let mut log = EventLog::new();
        assert_eq!(log.statistics(), EventStatistics::default());

        for gesture in [Hello, Yes, Hello, Yes, Good] {
            log.append(event(gesture)).unwrap();
        }
        let stats = log.statistics();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.unique, 3);
        assert_eq!(stats.most_detected, Some(Yes));

        log.append(event(Hello)).unwrap();
        assert_eq!(log.statistics().most_detected, Some(Hello));
    }

    #[test]
    fn tally_matches_log_statistics_without_keeping_events() {
        let mut log = EventLog::new();
        let mut tally = EventTally::new();
        for gesture in [Hello, Yes, Hello, Yes, Good, Hello] {
            log.append(event(gesture)).unwrap();
            tally.append(event(gesture)).unwrap();
        }

        assert_eq!(tally.statistics(), log.statistics());
        assert_eq!(tally.count(Hello), 3);
        assert_eq!(tally.count(Stop), 0);
        assert_eq!(EventTally::new().statistics(), EventStatistics::default());
    }

    #[test]
    fn clear_reports_removed_count() {
        let mut log = EventLog::new();
        log.append(event(Yes)).unwrap();
        log.append(event(Yes)).unwrap();
        assert_eq!(log.clear(), 2);
        assert!(log.is_empty());
        assert_eq!(log.clear(), 0);
    }

    #[test]
    fn recorder_appends_once_per_confirmation() {
        let mut recorder = EventRecorder::new(Debouncer::new(2), EventLog::new(), 0.9);
        let labels = [Some(Yes), Some(Yes), Some(Yes), None, Some(Hello), Some(Hello)];
        let confirmed: Vec<_> = labels
            .iter()
            .filter_map(|label| recorder.observe(*label))
            .map(|e| e.gesture)
            .collect();

        assert_eq!(confirmed, vec![Yes, Hello]);
        let stored: Vec<_> = recorder.sink().all().into_iter().map(|e| e.gesture).collect();
        assert_eq!(stored, vec![Hello, Yes]);
        assert!(recorder.sink().all().iter().all(|e| e.confidence == 0.9));
    }

    struct FailingSink;

    impl EventSink for FailingSink {
        fn append(&mut self, _event: ConfirmedEvent) -> anyhow::Result<()> {
            Err(anyhow!("disk full"))
        }
    }

    #[test]
    fn sink_failure_does_not_disturb_debouncing() {
        let mut recorder = EventRecorder::new(Debouncer::new(2), FailingSink, 0.9);
        assert!(recorder.observe(Some(Yes)).is_none());
        assert!(recorder.observe(Some(Yes)).is_some());
        assert_eq!(recorder.debouncer().state().consecutive, 0);
        assert!(recorder.observe(Some(Yes)).is_none());
        assert!(recorder.observe(Some(Yes)).is_some());
    }
}
