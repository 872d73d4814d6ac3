use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTimings {
    pub initial: Duration,
    pub reset: Duration,
}

impl Default for DebounceTimings {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(5),
            reset: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    /// First signal seen, waiting out the initial window.
    PendingLong { deadline: Instant },
    /// Further signals arrived, waiting out the shorter reset window.
    PendingShort { deadline: Instant },
}

/// Turns a burst of delete signals into a single sweep.
///
/// Time is passed in by the caller, so transitions can be driven with any
/// clock.
#[derive(Debug, Clone)]
pub struct Debouncer {
    timings: DebounceTimings,
    state: DebounceState,
}

impl Debouncer {
    pub fn new(timings: DebounceTimings) -> Self {
        Self {
            timings,
            state: DebounceState::Idle,
        }
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state != DebounceState::Idle
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            DebounceState::Idle => None,
            DebounceState::PendingLong { deadline } | DebounceState::PendingShort { deadline } => {
                Some(deadline)
            }
        }
    }

    pub fn signal(&mut self, now: Instant) -> DebounceState {
        self.state = match self.state {
            DebounceState::Idle => DebounceState::PendingLong {
                deadline: now + self.timings.initial,
            },
            DebounceState::PendingLong { .. } | DebounceState::PendingShort { .. } => {
                DebounceState::PendingShort {
                    deadline: now + self.timings.reset,
                }
            }
        };
        self.state
    }

    /// Returns true exactly once per pending window, when its deadline has
    /// passed. The machine is back to idle afterwards.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.state = DebounceState::Idle;
                true
            }
            _ => false,
        }
    }
}
