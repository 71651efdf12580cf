//! Hint panel coordination.
//!
//! The panel is a small chat with the hint source. It never touches session
//! state directly: every method returns what the session should do (pause,
//! resume, mark the hint as used) and the session controller applies it.
//!
//! ```text
//! Closed --open--> Open --close--> Closed
//!                   |
//!             submit / complete   (one request in flight at a time)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::HintError;
use crate::question::Question;

/// Chat line shown when the hint source fails.
pub const HINT_FALLBACK_MESSAGE: &str =
    "Sorry, I can't come up with a hint right now. Try again in a moment.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelState {
    Closed,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

/// Body of `POST /game-hint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintRequest {
    pub question: String,
    pub solution: String,
    pub options: Vec<String>,
    pub user_message: String,
}

impl HintRequest {
    pub fn new(question: &Question, user_message: impl Into<String>) -> Self {
        Self {
            question: question.text.clone(),
            solution: question.correct_answer.clone(),
            options: question.options.clone(),
            user_message: user_message.into(),
        }
    }
}

/// Why a submission was turned away. Rejected messages are dropped, not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintRejection {
    InFlight,
    EmptyMessage,
    PanelClosed,
    NoQuestion,
}

impl std::fmt::Display for HintRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            HintRejection::InFlight => "a hint is already on its way",
            HintRejection::EmptyMessage => "message is empty",
            HintRejection::PanelClosed => "hint panel is closed",
            HintRejection::NoQuestion => "no question on screen",
        };
        f.write_str(text)
    }
}

/// An accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintSubmission {
    pub request: HintRequest,
    /// True only for the first message of the round.
    pub marks_hint_used: bool,
}

#[derive(Debug, Clone)]
pub struct HintPanel {
    state: PanelState,
    /// Set when opening the panel paused the round timer.
    holds_pause: bool,
    /// Round of the request currently awaiting an answer.
    in_flight: Option<u32>,
    hint_signaled: bool,
    transcript: Vec<ChatMessage>,
}

impl HintPanel {
    pub fn new() -> Self {
        Self {
            state: PanelState::Closed,
            holds_pause: false,
            in_flight: None,
            hint_signaled: false,
            transcript: Vec::new(),
        }
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == PanelState::Open
    }

    pub fn is_waiting(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Open the panel. Returns true if the round timer should pause.
    ///
    /// `round_active` is false while the answer is locked or the round is
    /// transitioning; the timer is already stopped then and the panel must
    /// not take ownership of the pause.
    pub fn open(&mut self, round_active: bool) -> bool {
        if self.is_open() {
            return false;
        }
        self.state = PanelState::Open;
        self.holds_pause = round_active;
        self.holds_pause
    }

    /// Close the panel. Returns true if the round timer should resume.
    pub fn close(&mut self, round_active: bool) -> bool {
        if !self.is_open() {
            return false;
        }
        self.state = PanelState::Closed;
        let resume = self.holds_pause && round_active;
        self.holds_pause = false;
        resume
    }

    /// Accept a player message for `round`, or say why not.
    pub fn submit(
        &mut self,
        round: u32,
        question: Option<&Question>,
        message: &str,
    ) -> Result<HintSubmission, HintRejection> {
        if !self.is_open() {
            return Err(HintRejection::PanelClosed);
        }
        if self.in_flight.is_some() {
            return Err(HintRejection::InFlight);
        }
        let message = message.trim();
        if message.is_empty() {
            return Err(HintRejection::EmptyMessage);
        }
        let question = question.ok_or(HintRejection::NoQuestion)?;

        self.in_flight = Some(round);
        self.transcript.push(ChatMessage {
            role: ChatRole::User,
            text: message.to_string(),
        });

        let marks_hint_used = !self.hint_signaled;
        self.hint_signaled = true;

        Ok(HintSubmission {
            request: HintRequest::new(question, message),
            marks_hint_used,
        })
    }

    /// Record the hint source's answer. Returns the chat line to show, or
    /// `None` if the answer belongs to a round that is already over.
    pub fn complete(
        &mut self,
        round: u32,
        outcome: Result<String, HintError>,
    ) -> Option<ChatMessage> {
        if self.in_flight != Some(round) {
            return None;
        }
        self.in_flight = None;

        let text = outcome.unwrap_or_else(|_| HINT_FALLBACK_MESSAGE.to_string());
        let message = ChatMessage {
            role: ChatRole::Assistant,
            text,
        };
        self.transcript.push(message.clone());
        Some(message)
    }

    /// Start a fresh round: closed panel, empty chat, hint not yet used.
    /// Returns true if the panel was open.
    pub fn reset_round(&mut self) -> bool {
        let was_open = self.is_open();
        self.state = PanelState::Closed;
        self.holds_pause = false;
        self.in_flight = None;
        self.hint_signaled = false;
        self.transcript.clear();
        was_open
    }
}

impl Default for HintPanel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question() -> Question {
        Question {
            text: "Which mountain is this?".into(),
            options: vec![
                "Fuji".into(),
                "Etna".into(),
                "Kilimanjaro".into(),
                "Denali".into(),
            ],
            correct_answer: "Etna".into(),
            category: "mountains".into(),
            image_url: None,
        }
    }

    #[test]
    fn open_close_while_active_pauses_then_resumes() {
        let mut panel = HintPanel::new();
        assert!(panel.open(true));
        assert!(panel.is_open());
        assert!(panel.close(true));
        assert!(!panel.is_open());
    }

    #[test]
    fn open_while_locked_never_resumes() {
        let mut panel = HintPanel::new();
        assert!(!panel.open(false));
        assert!(!panel.close(true));
    }

    #[test]
    fn close_after_round_locked_does_not_resume() {
        let mut panel = HintPanel::new();
        assert!(panel.open(true));
        assert!(!panel.close(false));
    }

    #[test]
    fn double_open_is_noop() {
        let mut panel = HintPanel::new();
        assert!(panel.open(true));
        assert!(!panel.open(true));
        assert!(panel.close(true));
        assert!(!panel.close(true));
    }

    #[test]
    fn first_message_marks_hint_used_once() {
        let mut panel = HintPanel::new();
        let q = question();
        panel.open(true);

        let first = panel.submit(1, Some(&q), "is it in Italy?").unwrap();
        assert!(first.marks_hint_used);
        assert_eq!(first.request.solution, "Etna");
        assert_eq!(first.request.user_message, "is it in Italy?");
        panel.complete(1, Ok("It is a volcano.".into()));

        let second = panel.submit(1, Some(&q), "more please").unwrap();
        assert!(!second.marks_hint_used);
    }

    #[test]
    fn second_submission_while_in_flight_is_rejected() {
        let mut panel = HintPanel::new();
        let q = question();
        panel.open(true);
        panel.submit(1, Some(&q), "hint?").unwrap();
        assert_eq!(
            panel.submit(1, Some(&q), "hello?"),
            Err(HintRejection::InFlight)
        );
        assert_eq!(panel.transcript().len(), 1);
    }

    #[test]
    fn rejections() {
        let mut panel = HintPanel::new();
        let q = question();
        assert_eq!(
            panel.submit(1, Some(&q), "hi"),
            Err(HintRejection::PanelClosed)
        );
        panel.open(true);
        assert_eq!(
            panel.submit(1, Some(&q), "   "),
            Err(HintRejection::EmptyMessage)
        );
        assert_eq!(panel.submit(1, None, "hi"), Err(HintRejection::NoQuestion));
        assert!(!panel.is_waiting());
    }

    #[test]
    fn failure_surfaces_fallback_message() {
        let mut panel = HintPanel::new();
        let q = question();
        panel.open(true);
        panel.submit(2, Some(&q), "help").unwrap();
        let reply = panel
            .complete(2, Err(HintError::Status(500)))
            .unwrap();
        assert_eq!(reply.role, ChatRole::Assistant);
        assert_eq!(reply.text, HINT_FALLBACK_MESSAGE);
        assert!(!panel.is_waiting());
    }

    #[test]
    fn stale_answer_is_discarded_after_reset() {
        let mut panel = HintPanel::new();
        let q = question();
        panel.open(true);
        panel.submit(3, Some(&q), "help").unwrap();
        assert!(panel.reset_round());
        assert!(panel.complete(3, Ok("late".into())).is_none());
        assert!(panel.transcript().is_empty());

        panel.open(true);
        let again = panel.submit(4, Some(&q), "new round").unwrap();
        assert!(again.marks_hint_used);
    }

    #[test]
    fn request_serializes_with_wire_names() {
        let req = HintRequest::new(&question(), "where?");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["question"], "Which mountain is this?");
        assert_eq!(json["solution"], "Etna");
        assert_eq!(json["userMessage"], "where?");
        assert_eq!(json["options"].as_array().unwrap().len(), 4);
    }
}
