mod round_timer;

pub use round_timer::{RoundTimer, Tick, TimerState};
