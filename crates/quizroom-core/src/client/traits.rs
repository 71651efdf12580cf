use std::future::Future;

use crate::error::{FetchError, HintError, ReportError};
use crate::hint::HintRequest;
use crate::ledger::GameReport;
use crate::question::Question;

/// Hands out one question per call for the given category.
pub trait QuestionSource: Send + Sync + 'static {
    fn fetch_question(
        &self,
        category: &str,
    ) -> impl Future<Output = Result<Question, FetchError>> + Send;
}

/// Answers a player's hint message with a short text.
pub trait HintSource: Send + Sync + 'static {
    fn request_hint(
        &self,
        request: &HintRequest,
    ) -> impl Future<Output = Result<String, HintError>> + Send;
}

/// Receives the final results of a finished session.
/// Storing them is the sink's business.
pub trait ReportSink: Send + Sync + 'static {
    fn deliver(&self, report: &GameReport) -> impl Future<Output = Result<(), ReportError>> + Send;
}
