//! # Quizroom Core Library
//!
//! This library provides the round orchestration for Quizroom, a timed
//! multiple-choice quiz game. It implements a CLI-first philosophy where the
//! whole game is playable from a standalone CLI binary; any other front end
//! is a thin layer over the same core library.
//!
//! ## Architecture
//!
//! - **Session Controller**: A sans-IO state machine. Callers feed it inputs
//!   (ticks, answers, loaded questions) and carry out the commands it returns
//! - **Runtime**: A tokio driver that owns one controller and runs its timers
//!   and requests as cancellable tasks
//! - **Clients**: HTTP question source, hint source and report sink
//! - **Config**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SessionController`]: Round/phase state machine
//! - [`SessionRuntime`]: Async driver for a controller
//! - [`RoundTimer`]: Per-round countdown
//! - [`compute_round_score`]: Round scoring
//! - [`HintPanel`]: Hint chat coordination
//! - [`Config`]: Application configuration management

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod hint;
pub mod ledger;
pub mod question;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod timer;

pub use client::{GatewayClient, HintSource, HttpReportSink, QuestionSource, ReportSink};
pub use config::Config;
pub use error::{ConfigError, CoreError, FetchError, HintError, ReportError, ValidationError};
pub use events::Event;
pub use hint::{ChatMessage, ChatRole, HintPanel, HintRequest, HINT_FALLBACK_MESSAGE};
pub use ledger::{GameReport, RoundLedger, RoundResult, SessionSummary};
pub use question::Question;
pub use runtime::{InputSender, SessionHandle, SessionOutcome, SessionRuntime, UserInput};
pub use scoring::{compute_round_score, SpeedTier};
pub use session::{Command, Phase, SessionConfig, SessionController, SessionState};
pub use timer::{RoundTimer, TimerState};
