//! External collaborators: question source, hint source, report sink.

mod gateway;
pub mod traits;

pub use gateway::{GatewayClient, HttpReportSink};
pub use traits::{HintSource, QuestionSource, ReportSink};
