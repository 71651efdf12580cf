//! Timed quiz session.
//!
//! [`SessionController`] owns the [`SessionState`] and is the only thing that
//! mutates it. The round timer and the hint panel report back through return
//! values, and the controller turns those into state changes, events and
//! [`Command`]s for the runtime.

mod controller;
mod state;


pub use controller::{Command, SessionController, LOCK_DELAY, TRANSITION_SECS};
pub use state::{
    default_themes, Phase, SessionConfig, SessionState, DEFAULT_THEMES, DEFAULT_TIME_LIMIT_SECS,
    DEFAULT_TOTAL_ROUNDS,
};
