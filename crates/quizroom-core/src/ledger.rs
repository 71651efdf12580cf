//! Append-only record of round outcomes.

use serde::{Deserialize, Serialize};

/// Outcome of one completed round. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    /// 1-based.
    pub round_index: u32,
    pub correct: bool,
    pub time_taken_seconds: u32,
    pub round_score: u32,
    pub used_hint: bool,
    pub category: String,
    pub correct_answer: String,
    /// `None` when the round timed out.
    #[serde(default)]
    pub selected_answer: Option<String>,
}

/// Totals handed out once the session ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub cumulative_score: u32,
    pub cumulative_correct: u32,
    pub results: Vec<RoundResult>,
}

/// Aggregate delivered to the reporting collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameReport {
    pub username: String,
    pub score: u32,
    pub num_correct: u32,
    pub total_questions: u32,
    pub round_results: Vec<RoundResult>,
}

impl SessionSummary {
    pub fn into_report(self, username: impl Into<String>, total_questions: u32) -> GameReport {
        GameReport {
            username: username.into(),
            score: self.cumulative_score,
            num_correct: self.cumulative_correct,
            total_questions,
            round_results: self.results,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoundLedger {
    results: Vec<RoundResult>,
}

impl RoundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, result: RoundResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoundResult> {
        self.results.iter()
    }

    pub fn as_slice(&self) -> &[RoundResult] {
        &self.results
    }

    pub fn total_score(&self) -> u32 {
        self.results.iter().map(|r| r.round_score).sum()
    }

    pub fn total_correct(&self) -> u32 {
        self.results.iter().filter(|r| r.correct).count() as u32
    }

    /// Consume the ledger. Results stay in round order.
    pub fn finalize(self) -> SessionSummary {
        SessionSummary {
            cumulative_score: self.total_score(),
            cumulative_correct: self.total_correct(),
            results: self.results,
        }
    }
}
