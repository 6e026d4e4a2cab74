//! Shared error types for the services crate.

use thiserror::Error;

use case_core::CaseError;

/// Errors emitted by a `CaseAuthority`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthorityError {
    #[error("invalid authority base url: {0}")]
    InvalidBaseUrl(String),
    #[error("authority returned status {0}")]
    HttpStatus(reqwest::StatusCode),
    /// Non-success status with a server-supplied explanation.
    #[error("{message}")]
    Rejected {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("authority response could not be decoded: {0}")]
    Decode(String),
    #[error(transparent)]
    InvalidCase(#[from] CaseError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("no scripted {0} available")]
    NotScripted(&'static str),
}

/// Errors emitted by the case session controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no case is loaded")]
    NotReady,
    #[error("case failed to load: {0}")]
    Load(String),
    #[error("answer this step correctly before moving on")]
    Locked,
    #[error("already at the first step")]
    AtFirstStep,
    #[error("already at the last step")]
    AtLastStep,
    #[error("retry is only available after an incorrect answer")]
    RetryNotAllowed,
}
