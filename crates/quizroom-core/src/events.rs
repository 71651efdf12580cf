use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hint::{ChatMessage, HintRejection};
use crate::ledger::{GameReport, RoundResult};
use crate::question::Question;

/// Every state change in a session produces an Event.
/// Front ends render them; nothing in the core reads them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: Uuid,
        username: String,
        total_rounds: u32,
        time_limit_secs: u32,
        at: DateTime<Utc>,
    },
    QuestionRequested {
        round_index: u32,
        category: String,
        at: DateTime<Utc>,
    },
    RoundStarted {
        round_index: u32,
        question: Question,
        time_limit_secs: u32,
        at: DateTime<Utc>,
    },
    TimerTicked {
        round_index: u32,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    TimerPaused {
        round_index: u32,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    TimerResumed {
        round_index: u32,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    TimerExpired {
        round_index: u32,
        at: DateTime<Utc>,
    },
    /// Answer given (or time ran out). `selected_answer` is `None` on timeout.
    AnswerLocked {
        round_index: u32,
        selected_answer: Option<String>,
        correct_answer: String,
        correct: bool,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    RoundScored {
        result: RoundResult,
        cumulative_score: u32,
        cumulative_correct: u32,
        at: DateTime<Utc>,
    },
    /// Visible countdown between rounds: 3, 2, 1, 0.
    TransitionCountdown {
        round_index: u32,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    HintPanelOpened {
        round_index: u32,
        at: DateTime<Utc>,
    },
    HintPanelClosed {
        round_index: u32,
        at: DateTime<Utc>,
    },
    HintRequested {
        round_index: u32,
        message: String,
        at: DateTime<Utc>,
    },
    HintRejected {
        round_index: u32,
        reason: HintRejection,
        at: DateTime<Utc>,
    },
    /// First hint message of the round: the score for this round is halved.
    HintUsed {
        round_index: u32,
        at: DateTime<Utc>,
    },
    HintAnswered {
        round_index: u32,
        message: ChatMessage,
        /// True when the hint source failed and the fallback line was shown.
        fallback: bool,
        at: DateTime<Utc>,
    },
    FetchFailed {
        round_index: u32,
        message: String,
        /// The source has no more questions for the category.
        exhausted: bool,
        at: DateTime<Utc>,
    },
    SessionFinished {
        report: GameReport,
        at: DateTime<Utc>,
    },
    SessionAbandoned {
        round_index: u32,
        at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::TimerTicked {
            round_index: 2,
            remaining_secs: 17,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TimerTicked");
        assert_eq!(json["remaining_secs"], 17);

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
