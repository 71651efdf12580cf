use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ledger::RoundLedger;
use crate::question::Question;

pub const DEFAULT_TOTAL_ROUNDS: u32 = 10;
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 180;

/// Built-in question categories, all enabled by default.
pub const DEFAULT_THEMES: [&str; 5] = ["flags", "landmarks", "paintings", "animals", "people"];

/// Settings fixed for the lifetime of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub username: String,
    pub total_rounds: u32,
    pub time_limit_secs: u32,
    /// Category -> enabled.
    pub themes: BTreeMap<String, bool>,
    /// Seed for category selection. `None` draws from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SessionConfig {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            themes: default_themes(),
            seed: None,
        }
    }

    pub fn with_rounds(mut self, total_rounds: u32) -> Self {
        self.total_rounds = total_rounds;
        self
    }

    pub fn with_time_limit(mut self, time_limit_secs: u32) -> Self {
        self.time_limit_secs = time_limit_secs;
        self
    }

    pub fn with_themes<I, S>(mut self, enabled: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.themes = enabled.into_iter().map(|t| (t.into(), true)).collect();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enabled categories in stable (sorted) order.
    pub fn enabled_themes(&self) -> Vec<&str> {
        self.themes
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.total_rounds == 0 {
            return Err(ValidationError::ZeroRounds);
        }
        if self.time_limit_secs == 0 {
            return Err(ValidationError::ZeroTimeLimit);
        }
        if self.enabled_themes().is_empty() {
            return Err(ValidationError::NoThemes);
        }
        if self.username.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "username".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

pub fn default_themes() -> BTreeMap<String, bool> {
    DEFAULT_THEMES
        .iter()
        .map(|t| (t.to_string(), true))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for the question of `current_round_index`.
    Loading,
    /// Question on screen, countdown running (or paused by the hint panel).
    Active,
    /// Answer given or time up; showing the outcome for the lock delay.
    AnswerLocked,
    /// Between rounds; visible countdown while the next question loads.
    Transitioning,
    Finished,
    /// Question fetch failed. Waits for an explicit retry or abandon.
    Failed,
    Abandoned,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Finished | Phase::Abandoned)
    }
}

/// Snapshot of the session owned by the controller.
///
/// Only the controller mutates it; everyone else sees a shared reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub phase: Phase,
    /// 1-based.
    pub current_round_index: u32,
    pub remaining_seconds: u32,
    pub cumulative_score: u32,
    pub cumulative_correct: u32,
    pub is_paused: bool,
    pub is_transitioning: bool,
    pub transition_remaining: u32,
    pub hint_used_this_round: bool,
    pub current_question: Option<Question>,
    pub selected_answer: Option<String>,
    /// Handed over to the session summary when the session finishes.
    pub ledger: RoundLedger,
    /// User-visible message for the last fetch failure.
    pub last_error: Option<String>,
}

impl SessionState {
    pub fn new(time_limit_secs: u32) -> Self {
        Self {
            phase: Phase::Loading,
            current_round_index: 1,
            remaining_seconds: time_limit_secs,
            cumulative_score: 0,
            cumulative_correct: 0,
            is_paused: false,
            is_transitioning: false,
            transition_remaining: 0,
            hint_used_this_round: false,
            current_question: None,
            selected_answer: None,
            ledger: RoundLedger::new(),
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = SessionConfig::new("ada");
        assert_eq!(cfg.total_rounds, 10);
        assert_eq!(cfg.time_limit_secs, 180);
        assert_eq!(cfg.enabled_themes().len(), DEFAULT_THEMES.len());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validation_errors() {
        assert_eq!(
            SessionConfig::new("ada").with_rounds(0).validate(),
            Err(ValidationError::ZeroRounds)
        );
        assert_eq!(
            SessionConfig::new("ada").with_time_limit(0).validate(),
            Err(ValidationError::ZeroTimeLimit)
        );

        let mut cfg = SessionConfig::new("ada");
        for enabled in cfg.themes.values_mut() {
            *enabled = false;
        }
        assert_eq!(cfg.validate(), Err(ValidationError::NoThemes));

        assert!(matches!(
            SessionConfig::new("  ").validate(),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn enabled_themes_skips_disabled_and_is_sorted() {
        let mut cfg = SessionConfig::new("ada").with_themes(["paintings", "flags"]);
        cfg.themes.insert("animals".into(), false);
        assert_eq!(cfg.enabled_themes(), vec!["flags", "paintings"]);
    }
}
