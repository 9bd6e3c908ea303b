use crate::types::Gesture;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DebounceState {
    pub last: Option<Gesture>,
    pub consecutive: u32,
}

/// Turns a noisy per-frame label stream into discrete confirmed events.
///
/// A label is confirmed once it has been observed `threshold` frames in a row.
/// Confirmation resets the state, so a held pose fires again only after another
/// full run.
#[derive(Clone, Debug)]
pub struct Debouncer {
    threshold: u32,
    state: DebounceState,
}

impl Debouncer {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            state: DebounceState::default(),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = DebounceState::default();
    }

    /// Feeds one frame's label; returns the gesture if this frame confirms it.
    pub fn observe(&mut self, label: Option<Gesture>) -> Option<Gesture> {
        if label == self.state.last {
            self.state.consecutive = self.state.consecutive.saturating_add(1);
        } else {
            self.state = DebounceState {
                last: label,
                consecutive: 1,
            };
        }

        let gesture = label?;
        if self.state.consecutive >= self.threshold {
            self.reset();
            return Some(gesture);
        }
        None
    }
}
