use std::env;
use std::time::Duration;

use case_core::model::{Step, StepKind, TimeoutOverride};

pub const DEFAULT_API_URL: &str = "http://localhost:4000/api";

const MIN_OVERRIDE: Duration = Duration::from_millis(1);

/// Where the remote case authority lives and how to authenticate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorityConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl AuthorityConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.trim().is_empty()).then_some(token);
        self
    }

    /// Reads `CASESIM_API_URL` and `CASESIM_TOKEN`.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("CASESIM_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.into());
        let config = Self::new(base_url);
        match env::var("CASESIM_TOKEN") {
            Ok(token) => config.with_token(token),
            Err(_) => config,
        }
    }
}

/// Inactivity thresholds that trigger a hint, per step kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdlePolicy {
    mcq: Duration,
    history: Duration,
    diagnosis: Duration,
    treatment: Duration,
    info: Duration,
    investigation: Duration,
    fallback: Duration,
}

impl Default for IdlePolicy {
    fn default() -> Self {
        Self {
            mcq: Duration::from_secs(45),
            history: Duration::from_secs(90),
            diagnosis: Duration::from_secs(120),
            treatment: Duration::from_secs(90),
            info: Duration::from_secs(30),
            investigation: Duration::from_secs(60),
            fallback: Duration::from_secs(60),
        }
    }
}

impl IdlePolicy {
    /// Replace the default for one kind. `StepKind::Other` sets the fallback.
    #[must_use]
    pub fn with_timeout(mut self, kind: &StepKind, timeout: Duration) -> Self {
        *self.slot_mut(kind) = timeout;
        self
    }

    fn slot_mut(&mut self, kind: &StepKind) -> &mut Duration {
        match kind {
            StepKind::Mcq => &mut self.mcq,
            StepKind::History => &mut self.history,
            StepKind::Diagnosis => &mut self.diagnosis,
            StepKind::Treatment => &mut self.treatment,
            StepKind::Info => &mut self.info,
            StepKind::Investigation => &mut self.investigation,
            StepKind::Other(_) => &mut self.fallback,
        }
    }

    #[must_use]
    pub fn default_for(&self, kind: &StepKind) -> Duration {
        match kind {
            StepKind::Mcq => self.mcq,
            StepKind::History => self.history,
            StepKind::Diagnosis => self.diagnosis,
            StepKind::Treatment => self.treatment,
            StepKind::Info => self.info,
            StepKind::Investigation => self.investigation,
            StepKind::Other(_) => self.fallback,
        }
    }

    /// A usable per-step override wins over the kind default.
    ///
    /// Overrides are floored at one millisecond so a vanishingly small value
    /// never resolves to a zero deadline.
    #[must_use]
    pub fn resolve(&self, step: &Step) -> Duration {
        step.idle_timeout()
            .and_then(TimeoutOverride::seconds)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .map(|timeout| timeout.max(MIN_OVERRIDE))
            .unwrap_or_else(|| self.default_for(step.kind()))
    }
}
