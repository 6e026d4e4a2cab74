use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use case_core::model::{Case, CaseId, StepId};

use super::wire::{CaseRecord, HintRecord};
use super::{AnswerSubmission, AnswerVerdict, CaseAuthority};
use crate::config::AuthorityConfig;
use crate::error::AuthorityError;

/// `CaseAuthority` over the authority's JSON HTTP API.
#[derive(Clone, Debug)]
pub struct HttpCaseAuthority {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpCaseAuthority {
    /// # Errors
    ///
    /// Returns `AuthorityError::InvalidBaseUrl` if the base url cannot be parsed
    /// or cannot carry path segments.
    pub fn new(config: AuthorityConfig) -> Result<Self, AuthorityError> {
        let base = Url::parse(config.base_url.trim())
            .map_err(|_| AuthorityError::InvalidBaseUrl(config.base_url.clone()))?;
        if base.cannot_be_a_base() {
            return Err(AuthorityError::InvalidBaseUrl(config.base_url));
        }
        Ok(Self {
            client: Client::new(),
            base,
            token: config.token,
        })
    }

    /// # Errors
    ///
    /// Returns `AuthorityError::InvalidBaseUrl` for a malformed `CASESIM_API_URL`.
    pub fn from_env() -> Result<Self, AuthorityError> {
        Self::new(AuthorityConfig::from_env())
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Decode a success body, or turn a failure status into an error carrying
/// the server's `message`/`error` text when it sent one.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, AuthorityError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(match server_message(&body) {
            Some(message) => AuthorityError::Rejected { status, message },
            None => AuthorityError::HttpStatus(status),
        });
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| AuthorityError::Decode(e.to_string()))
}

fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl CaseAuthority for HttpCaseAuthority {
    async fn fetch_case(&self, case_id: &CaseId) -> Result<Case, AuthorityError> {
        let url = self.endpoint(&["cases", case_id.as_str()]);
        let response = self.request(Method::GET, url).send().await?;
        let record: CaseRecord = read_json(response).await?;
        Ok(record.into_case()?)
    }

    async fn submit_answer(
        &self,
        case_id: &CaseId,
        step_id: &StepId,
        submission: &AnswerSubmission,
    ) -> Result<AnswerVerdict, AuthorityError> {
        let url = self.endpoint(&[
            "cases",
            case_id.as_str(),
            "steps",
            step_id.as_str(),
            "answer",
        ]);
        let response = self
            .request(Method::POST, url)
            .json(submission)
            .send()
            .await?;
        read_json(response).await
    }

    async fn fetch_hint(&self, step_id: &StepId) -> Result<Option<String>, AuthorityError> {
        let url = self.endpoint(&["steps", step_id.as_str(), "hint"]);
        let response = self.request(Method::GET, url).send().await?;
        let record: HintRecord = read_json(response).await?;
        Ok(record.into_hint())
    }
}
