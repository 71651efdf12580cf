//! Per-round countdown.
//!
//! The round timer is a count-based state machine. It does not use internal
//! threads or read the clock - the caller delivers one `tick()` per elapsed
//! second and the timer decrements by exactly one.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!           |
//!           v
//!        Expired -> (start) -> Running
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = RoundTimer::new();
//! timer.start(180);
//! // Once per second:
//! if let Tick::Expired = timer.tick() {
//!     // lock the round
//! }
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    /// Reached zero. Inert until the next `start`.
    Expired,
}

/// Outcome of a single `tick()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Timer is idle or already expired; nothing changed.
    Inert { remaining: u32 },
    /// Timer is paused; nothing changed.
    Paused { remaining: u32 },
    /// One second elapsed.
    Running { remaining: u32 },
    /// This tick brought the countdown to zero. Returned once per round.
    Expired,
}

impl Tick {
    pub fn remaining(&self) -> u32 {
        match *self {
            Tick::Inert { remaining } | Tick::Paused { remaining } | Tick::Running { remaining } => {
                remaining
            }
            Tick::Expired => 0,
        }
    }
}

type ExpireCallback = Box<dyn FnMut() + Send>;

/// Countdown for a single round.
pub struct RoundTimer {
    state: TimerState,
    limit_secs: u32,
    remaining_secs: u32,
    on_expire: Option<ExpireCallback>,
}

impl RoundTimer {
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
            limit_secs: 0,
            remaining_secs: 0,
            on_expire: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn remaining(&self) -> u32 {
        self.remaining_secs
    }

    pub fn limit(&self) -> u32 {
        self.limit_secs
    }

    pub fn elapsed(&self) -> u32 {
        self.limit_secs.saturating_sub(self.remaining_secs)
    }

    pub fn is_paused(&self) -> bool {
        self.state == TimerState::Paused
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Register the expiry listener. Replaces any previous one.
    pub fn on_expire<F>(&mut self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.on_expire = Some(Box::new(callback));
    }

    /// (Re)start the countdown at `limit_secs`. Works from any state.
    pub fn start(&mut self, limit_secs: u32) {
        self.limit_secs = limit_secs;
        self.remaining_secs = limit_secs;
        self.state = if limit_secs == 0 {
            TimerState::Expired
        } else {
            TimerState::Running
        };
    }

    /// Returns true if the timer was running and is now paused.
    pub fn pause(&mut self) -> bool {
        if self.state == TimerState::Running {
            self.state = TimerState::Paused;
            true
        } else {
            false
        }
    }

    /// Returns true if the timer was paused and is now running.
    pub fn resume(&mut self) -> bool {
        if self.state == TimerState::Paused {
            self.state = TimerState::Running;
            true
        } else {
            false
        }
    }

    /// Stop counting without expiring. Used when the round locks on an answer.
    pub fn stop(&mut self) {
        if matches!(self.state, TimerState::Running | TimerState::Paused) {
            self.state = TimerState::Idle;
        }
    }

    /// Advance one second.
    pub fn tick(&mut self) -> Tick {
        match self.state {
            TimerState::Running => {
                self.remaining_secs = self.remaining_secs.saturating_sub(1);
                if self.remaining_secs == 0 {
                    self.state = TimerState::Expired;
                    if let Some(callback) = self.on_expire.as_mut() {
                        callback();
                    }
                    Tick::Expired
                } else {
                    Tick::Running {
                        remaining: self.remaining_secs,
                    }
                }
            }
            TimerState::Paused => Tick::Paused {
                remaining: self.remaining_secs,
            },
            TimerState::Idle | TimerState::Expired => Tick::Inert {
                remaining: self.remaining_secs,
            },
        }
    }
}

impl Default for RoundTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RoundTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundTimer")
            .field("state", &self.state)
            .field("limit_secs", &self.limit_secs)
            .field("remaining_secs", &self.remaining_secs)
            .field("on_expire", &self.on_expire.is_some())
            .finish()
    }
}
