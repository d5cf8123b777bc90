use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Ready to fire on the next sentinel sighting.
    Armed,
    /// Fired; waiting for the load to settle.
    Waiting,
    /// Settled; ignores the sentinel until the instant passes.
    Cooling(Instant),
}

/// Turns "the end of the list is visible" into at most one load-more per
/// settle-plus-cooldown cycle.
#[derive(Debug)]
pub struct LoadMoreGate {
    state: GateState,
    cooldown: Duration,
}

impl LoadMoreGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            state: GateState::Armed,
            cooldown,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Returns `true` when a load-more should be issued now.
    pub fn on_sentinel_visible(&mut self, now: Instant, has_next: bool, loading: bool) -> bool {
        if !has_next || loading {
            return false;
        }
        let fire = match self.state {
            GateState::Armed => true,
            GateState::Waiting => false,
            GateState::Cooling(until) => now >= until,
        };
        if fire {
            self.state = GateState::Waiting;
        }
        fire
    }

    /// The load issued by this gate finished, successfully or not.
    pub fn on_settled(&mut self, now: Instant) {
        if self.state == GateState::Waiting {
            self.state = GateState::Cooling(now + self.cooldown);
        }
    }

    /// Re-arms the gate for a fresh result list.
    pub fn reset(&mut self) {
        self.state = GateState::Armed;
    }
}

/// The last result row is inside the viewport `offset..offset + rows`.
pub fn sentinel_visible(offset: usize, rows: usize, len: usize) -> bool {
    len > 0 && rows > 0 && offset + rows > len.saturating_sub(1)
}
