use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Number of answer options every question carries.
pub const OPTION_COUNT: usize = 4;

/// An image trivia question as served by the question source.
///
/// Field names on the wire are camelCase (`correctAnswer`, `imageUrl`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Question {
    /// Reject questions the game cannot present.
    pub fn validate(self) -> Result<Self, FetchError> {
        if self.options.len() != OPTION_COUNT {
            return Err(FetchError::Malformed(format!(
                "expected {OPTION_COUNT} options, got {}",
                self.options.len()
            )));
        }
        if !self.options.iter().any(|o| *o == self.correct_answer) {
            return Err(FetchError::Malformed(
                "correct answer is not among the options".into(),
            ));
        }
        Ok(self)
    }

    pub fn option(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(String::as_str)
    }

    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer == answer
    }
}
