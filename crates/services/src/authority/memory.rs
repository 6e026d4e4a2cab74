use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use reqwest::StatusCode;

use case_core::model::{Case, CaseId, StepId};

use super::{AnswerSubmission, AnswerVerdict, CaseAuthority};
use crate::error::AuthorityError;

/// A submission as received by the scripted authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSubmission {
    pub case_id: CaseId,
    pub step_id: StepId,
    pub submission: AnswerSubmission,
}

#[derive(Default)]
struct Script {
    cases: HashMap<CaseId, Case>,
    load_failure: Option<String>,
    verdicts: VecDeque<Result<AnswerVerdict, String>>,
    hints: HashMap<StepId, Result<Option<String>, String>>,
    submissions: Vec<RecordedSubmission>,
    hint_requests: Vec<StepId>,
}

/// In-memory authority for tests and offline prototyping.
///
/// Verdicts are served in the order they were queued; hints are keyed by
/// step. Every call is recorded so callers can assert on side effects.
#[derive(Clone, Default)]
pub struct ScriptedAuthority {
    script: Arc<Mutex<Script>>,
}

impl ScriptedAuthority {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn with_case(self, case: Case) -> Self {
        self.lock().cases.insert(case.id().clone(), case);
        self
    }

    /// Make every case load fail with `message`.
    #[must_use]
    pub fn failing_loads(self, message: impl Into<String>) -> Self {
        self.lock().load_failure = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_hint(self, step: impl Into<StepId>, hint: impl Into<String>) -> Self {
        self.lock().hints.insert(step.into(), Ok(Some(hint.into())));
        self
    }

    #[must_use]
    pub fn with_hint_failure(self, step: impl Into<StepId>, message: impl Into<String>) -> Self {
        self.lock().hints.insert(step.into(), Err(message.into()));
        self
    }

    pub fn push_verdict(&self, verdict: AnswerVerdict) {
        self.lock().verdicts.push_back(Ok(verdict));
    }

    /// Queue a submission that the authority rejects with `message`.
    pub fn push_rejection(&self, message: impl Into<String>) {
        self.lock().verdicts.push_back(Err(message.into()));
    }

    #[must_use]
    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.lock().submissions.clone()
    }

    #[must_use]
    pub fn hint_requests(&self) -> Vec<StepId> {
        self.lock().hint_requests.clone()
    }
}

fn rejected(status: StatusCode, message: String) -> AuthorityError {
    AuthorityError::Rejected { status, message }
}

#[async_trait]
impl CaseAuthority for ScriptedAuthority {
    async fn fetch_case(&self, case_id: &CaseId) -> Result<Case, AuthorityError> {
        let script = self.lock();
        if let Some(message) = &script.load_failure {
            return Err(rejected(StatusCode::INTERNAL_SERVER_ERROR, message.clone()));
        }
        script
            .cases
            .get(case_id)
            .cloned()
            .ok_or_else(|| rejected(StatusCode::NOT_FOUND, format!("case {case_id} not found")))
    }

    async fn submit_answer(
        &self,
        case_id: &CaseId,
        step_id: &StepId,
        submission: &AnswerSubmission,
    ) -> Result<AnswerVerdict, AuthorityError> {
        let mut script = self.lock();
        script.submissions.push(RecordedSubmission {
            case_id: case_id.clone(),
            step_id: step_id.clone(),
            submission: submission.clone(),
        });
        match script.verdicts.pop_front() {
            Some(Ok(verdict)) => Ok(verdict),
            Some(Err(message)) => Err(rejected(StatusCode::UNPROCESSABLE_ENTITY, message)),
            None => Err(AuthorityError::NotScripted("verdict")),
        }
    }

    async fn fetch_hint(&self, step_id: &StepId) -> Result<Option<String>, AuthorityError> {
        let mut script = self.lock();
        script.hint_requests.push(step_id.clone());
        match script.hints.get(step_id) {
            Some(Ok(hint)) => Ok(hint.clone()),
            Some(Err(message)) => Err(rejected(StatusCode::BAD_GATEWAY, message.clone())),
            None => Ok(None),
        }
    }
}
