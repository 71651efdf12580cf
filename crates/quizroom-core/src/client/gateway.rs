//! HTTP clients for the gateway -- questions, hints and stats.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::traits::{HintSource, QuestionSource, ReportSink};
use crate::error::{FetchError, HintError, ReportError};
use crate::hint::HintRequest;
use crate::ledger::GameReport;
use crate::question::Question;

#[derive(Debug, Deserialize)]
struct HintResponse {
    answer: String,
}

/// Question and hint endpoints behind one gateway base URL.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: Url,
}

impl GatewayClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, String> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| format!("{} cannot be used as a base URL", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl QuestionSource for GatewayClient {
    async fn fetch_question(&self, category: &str) -> Result<Question, FetchError> {
        let url = self
            .endpoint(&["questions", category])
            .map_err(FetchError::Unreachable)?;
        debug!(%url, "fetching question");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                category: category.to_string(),
            });
        }
        let question: Question = resp.json().await?;
        question.validate()
    }
}

impl HintSource for GatewayClient {
    async fn request_hint(&self, request: &HintRequest) -> Result<String, HintError> {
        let url = self
            .endpoint(&["game-hint"])
            .map_err(HintError::Unreachable)?;

        let resp = self.http.post(url).json(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(HintError::Status(status.as_u16()));
        }
        let body: HintResponse = resp.json().await?;
        Ok(body.answer)
    }
}

/// Posts the final report as JSON to a fixed URL.
#[derive(Debug, Clone)]
pub struct HttpReportSink {
    http: Client,
    url: Url,
}

impl HttpReportSink {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url })
    }
}

impl ReportSink for HttpReportSink {
    async fn deliver(&self, report: &GameReport) -> Result<(), ReportError> {
        let resp = self.http.post(self.url.clone()).json(report).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ReportError::Status(status.as_u16()))
        }
    }
}
