use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use case_core::model::{Case, CaseId, FinalSummary, OptionId, Step, StepId};
use case_core::Clock;

use super::state::{SessionPhase, StepInteraction};
use super::view::SessionView;
use crate::authority::{AnswerSubmission, CaseAuthority};
use crate::config::IdlePolicy;
use crate::error::SessionError;
use crate::watchdog::{ActivityWatchdog, IdleCallback};

//
// ─── IDLE SIGNALS ──────────────────────────────────────────────────────────────
//

/// Raised by the watchdog when the learner has been inactive on a step.
///
/// Tagged with the step and entry it was armed for, so a signal that is
/// handled after the learner moved on is discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdleSignal {
    step_id: StepId,
    entry: u64,
}

impl IdleSignal {
    #[must_use]
    pub fn step_id(&self) -> &StepId {
        &self.step_id
    }
}

/// Receiving end for idle signals; the host feeds each one back into
/// `CaseSession::on_idle_fired`.
#[derive(Debug)]
pub struct IdleSignals {
    rx: mpsc::UnboundedReceiver<IdleSignal>,
}

impl IdleSignals {
    pub async fn recv(&mut self) -> Option<IdleSignal> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<IdleSignal> {
        self.rx.try_recv().ok()
    }
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Result of `CaseSession::advance`.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Moved { index: usize },
    /// The case is finished; the only action left is completion.
    Finished(FinalSummary),
}

/// Result of `CaseSession::submit_answer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Preconditions not met; nothing was sent.
    Ignored,
    Incorrect,
    Correct,
    Finished,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Drives one learner through one case.
///
/// Sole owner and writer of session state. Every mutation goes through a
/// named operation; presentation reads snapshots via `view`.
///
/// Operations that (re)arm the watchdog must run inside a Tokio runtime.
pub struct CaseSession {
    authority: Arc<dyn CaseAuthority>,
    clock: Clock,
    policy: IdlePolicy,
    phase: SessionPhase,
    case: Option<Case>,
    cursor: usize,
    interaction: StepInteraction,
    summary: Option<FinalSummary>,
    watchdog: ActivityWatchdog,
    /// Bumped on every step entry and retry.
    entry: u64,
    idle_tx: mpsc::UnboundedSender<IdleSignal>,
}

impl CaseSession {
    #[must_use]
    pub fn new(
        authority: Arc<dyn CaseAuthority>,
        clock: Clock,
        policy: IdlePolicy,
    ) -> (Self, IdleSignals) {
        let (idle_tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            authority,
            clock,
            policy,
            phase: SessionPhase::Loading,
            case: None,
            cursor: 0,
            interaction: StepInteraction::fresh(clock.now()),
            summary: None,
            watchdog: ActivityWatchdog::new(),
            entry: 0,
            idle_tx,
        };
        (session, IdleSignals { rx })
    }

    // ─── Accessors ─────────────────────────────────────────────────────────

    #[must_use]
    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    #[must_use]
    pub fn case(&self) -> Option<&Case> {
        self.case.as_ref()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn current_step(&self) -> Option<&Step> {
        self.case.as_ref().and_then(|case| case.steps().get(self.cursor))
    }

    #[must_use]
    pub fn interaction(&self) -> &StepInteraction {
        &self.interaction
    }

    #[must_use]
    pub fn summary(&self) -> Option<&FinalSummary> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn watchdog(&self) -> &ActivityWatchdog {
        &self.watchdog
    }

    /// Message for a failed load, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        match &self.phase {
            SessionPhase::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Read-only replay of an already completed case.
    #[must_use]
    pub fn is_review(&self) -> bool {
        self.case.as_ref().is_some_and(Case::is_completed)
    }

    /// Whether forward navigation is open.
    #[must_use]
    pub fn can_advance(&self) -> bool {
        let Some(step) = self.current_step() else {
            return false;
        };
        self.is_review()
            || !step.kind().is_gated()
            || (self.interaction.selected.is_some() && self.interaction.correct == Some(true))
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.phase == SessionPhase::Ready && self.cursor > 0
    }

    #[must_use]
    pub fn can_retry(&self) -> bool {
        self.phase == SessionPhase::Ready
            && !self.is_review()
            && self.current_step().is_some_and(|step| step.kind().is_gated())
            && self.interaction.correct == Some(false)
    }

    /// `round(100 * (index + 1) / count)`, for display only.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        let Some(case) = &self.case else {
            return 0;
        };
        let count = case.step_count();
        let done = self.cursor + 1;
        let percent = (200 * done + count) / (2 * count);
        u8::try_from(percent.min(100)).unwrap_or(100)
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView {
            phase: self.phase.clone(),
            title: self.case.as_ref().map(|case| case.title().to_string()),
            review_mode: self.is_review(),
            step_index: self.cursor,
            step_count: self.case.as_ref().map_or(0, Case::step_count),
            step_kind: self.current_step().map(|step| step.kind().clone()),
            progress_percent: self.progress_percent(),
            selected: self.interaction.selected.clone(),
            feedback: self.interaction.feedback.clone(),
            correct: self.interaction.correct,
            attempt: self.interaction.attempt,
            hint: self.interaction.hint.clone(),
            hint_open: self.interaction.hint_open,
            can_advance: self.can_advance(),
            can_go_back: self.can_go_back(),
            can_retry: self.can_retry(),
            elapsed_seconds: self.watchdog.elapsed_seconds(),
            summary: self.summary.clone(),
        }
    }

    // ─── Loading ───────────────────────────────────────────────────────────

    /// Fetch the case and enter its first step.
    ///
    /// On failure the session moves to `SessionPhase::Failed` and keeps no
    /// partial state.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` carrying the message shown to the learner.
    pub async fn load_case(&mut self, case_id: &CaseId) -> Result<(), SessionError> {
        self.phase = SessionPhase::Loading;
        self.case = None;
        self.summary = None;
        self.cursor = 0;
        self.sync_watchdog(false);

        match self.authority.fetch_case(case_id).await {
            Ok(case) => {
                info!(
                    case_id = %case.id(),
                    steps = case.step_count(),
                    review = case.is_completed(),
                    "case loaded"
                );
                self.case = Some(case);
                self.phase = SessionPhase::Ready;
                self.enter_step(0);
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                warn!(case_id = %case_id, error = %message, "case load failed");
                self.phase = SessionPhase::Failed(message.clone());
                Err(SessionError::Load(message))
            }
        }
    }

    // ─── Navigation ────────────────────────────────────────────────────────

    /// Jump to a step, clamped to the valid range. Returns the new index.
    ///
    /// Ignored unless the session is `Ready`.
    pub fn select_step(&mut self, index: usize) -> usize {
        if self.phase != SessionPhase::Ready {
            return self.cursor;
        }
        let Some(last) = self.case.as_ref().map(|case| case.step_count() - 1) else {
            return self.cursor;
        };
        self.enter_step(index.min(last));
        self.cursor
    }

    /// Move forward one step, or hand back the summary once finished.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotReady` without a loaded case,
    /// `SessionError::Locked` while the gate is closed and
    /// `SessionError::AtLastStep` when there is nowhere to go.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        if let (SessionPhase::Completed, Some(summary)) = (&self.phase, &self.summary) {
            return Ok(Advance::Finished(summary.clone()));
        }
        if self.phase != SessionPhase::Ready {
            return Err(SessionError::NotReady);
        }
        if !self.can_advance() {
            return Err(SessionError::Locked);
        }
        let case = self.case.as_ref().ok_or(SessionError::NotReady)?;
        if case.is_last(self.cursor) {
            return Err(SessionError::AtLastStep);
        }
        self.enter_step(self.cursor + 1);
        Ok(Advance::Moved { index: self.cursor })
    }

    /// Move back one step.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotReady` without a navigable case and
    /// `SessionError::AtFirstStep` at index 0.
    pub fn go_back(&mut self) -> Result<usize, SessionError> {
        if self.phase != SessionPhase::Ready {
            return Err(SessionError::NotReady);
        }
        if self.cursor == 0 {
            return Err(SessionError::AtFirstStep);
        }
        self.enter_step(self.cursor - 1);
        Ok(self.cursor)
    }

    fn enter_step(&mut self, index: usize) {
        self.cursor = index;
        self.entry = self.entry.wrapping_add(1);
        self.interaction = StepInteraction::fresh(self.clock.now());

        if let Some(step) = self.case.as_ref().and_then(|case| case.steps().get(index)) {
            let saved = self.case.as_ref().and_then(|case| case.progress_for(step.id()));
            if let Some(saved) = saved {
                self.interaction.hydrate(step, saved);
            }
            debug!(step = index, step_id = %step.id(), kind = %step.kind(), "entered step");
        }
        self.sync_watchdog(true);
    }

    // ─── Answering ─────────────────────────────────────────────────────────

    /// Send the learner's choice to the authority and apply its verdict.
    ///
    /// Transport and validation failures are recorded as an incorrect answer
    /// with the error text as feedback, so the learner can always retry.
    pub async fn submit_answer(&mut self, option_id: &OptionId) -> SubmitOutcome {
        if self.phase != SessionPhase::Ready || self.is_review() || option_id.as_str().is_empty()
        {
            return SubmitOutcome::Ignored;
        }
        let Some(case) = &self.case else {
            return SubmitOutcome::Ignored;
        };
        let Some(step) = case.steps().get(self.cursor) else {
            return SubmitOutcome::Ignored;
        };

        let case_id = case.id().clone();
        let step_id = step.id().clone();
        let fallback_feedback = step
            .option(option_id)
            .and_then(|option| option.feedback())
            .map(str::to_string);
        let submission = AnswerSubmission {
            selected_option_id: option_id.clone(),
            is_final_step: case.is_last(self.cursor),
            time_spent: self.clock.seconds_since(self.interaction.started_at),
            hint_shown: self.interaction.hint_used,
            attempt_number: self.interaction.attempt,
        };
        self.interaction.selected = Some(option_id.clone());

        let outcome = match self
            .authority
            .submit_answer(&case_id, &step_id, &submission)
            .await
        {
            Ok(verdict) if verdict.correct => {
                self.interaction.correct = Some(true);
                self.interaction.feedback = None;
                if verdict.is_final {
                    let summary = verdict.summary();
                    info!(case_id = %case_id, score = summary.score, "case completed");
                    self.summary = Some(summary);
                    self.phase = SessionPhase::Completed;
                    SubmitOutcome::Finished
                } else {
                    SubmitOutcome::Correct
                }
            }
            Ok(verdict) => {
                self.interaction.correct = Some(false);
                self.interaction.feedback = verdict
                    .feedback
                    .filter(|text| !text.trim().is_empty())
                    .or(fallback_feedback);
                SubmitOutcome::Incorrect
            }
            Err(err) => {
                warn!(case_id = %case_id, step_id = %step_id, error = %err, "answer submission failed");
                self.interaction.correct = Some(false);
                self.interaction.feedback = Some(err.to_string());
                SubmitOutcome::Incorrect
            }
        };
        debug!(step_id = %step_id, attempt = submission.attempt_number, ?outcome, "answer applied");
        self.sync_watchdog(false);
        outcome
    }

    /// Start another attempt after an incorrect answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RetryNotAllowed` unless the current step is a
    /// decision point whose last answer was incorrect.
    pub fn retry(&mut self) -> Result<(), SessionError> {
        if !self.can_retry() {
            return Err(SessionError::RetryNotAllowed);
        }
        self.entry = self.entry.wrapping_add(1);
        self.interaction.next_attempt(self.clock.now());
        debug!(step = self.cursor, attempt = self.interaction.attempt, "retrying step");
        self.sync_watchdog(false);
        self.watchdog.reset();
        Ok(())
    }

    // ─── Hints ─────────────────────────────────────────────────────────────

    /// Forward host activity (pointer, key, scroll, touch) to the watchdog.
    pub fn notify_activity(&mut self) {
        self.watchdog.notify_activity();
    }

    /// Handle an idle signal: fetch a hint for the step it was armed for.
    ///
    /// Returns `true` when a hint was opened. Hint failures are logged and
    /// otherwise ignored.
    pub async fn on_idle_fired(&mut self, signal: IdleSignal) -> bool {
        if signal.entry != self.entry {
            debug!(step_id = %signal.step_id, "discarding stale idle signal");
            return false;
        }
        let Some(step) = self.current_step() else {
            return false;
        };
        if step.id() != &signal.step_id
            || self.phase != SessionPhase::Ready
            || self.is_review()
            || !step.kind().is_gated()
            || !step.hint_eligible()
            || self.interaction.hint_shown
            || self.interaction.correct == Some(true)
        {
            return false;
        }

        let step_id = step.id().clone();
        debug!(step_id = %step_id, "learner idle, requesting hint");
        match self.authority.fetch_hint(&step_id).await {
            Ok(Some(hint)) if !hint.trim().is_empty() => {
                self.interaction.hint = Some(hint);
                self.interaction.hint_shown = true;
                self.interaction.hint_used = true;
                self.interaction.hint_open = true;
                self.sync_watchdog(false);
                true
            }
            Ok(_) => {
                debug!(step_id = %step_id, "authority has no hint for step");
                false
            }
            Err(err) => {
                warn!(step_id = %step_id, error = %err, "hint fetch failed");
                false
            }
        }
    }

    /// Close the hint surface.
    pub fn dismiss_hint(&mut self) {
        if self.interaction.hint_open {
            self.interaction.hint_open = false;
            self.sync_watchdog(false);
        }
    }

    // ─── Watchdog ──────────────────────────────────────────────────────────

    fn should_arm(&self) -> bool {
        self.phase == SessionPhase::Ready
            && !self.is_review()
            && self.current_step().is_some_and(|step| {
                step.kind().is_gated()
                    && step.hint_eligible()
                    && self.interaction.correct != Some(true)
                    && !self.interaction.hint_open
            })
    }

    fn idle_callback(&self) -> IdleCallback {
        let tx = self.idle_tx.clone();
        let signal = self.current_step().map(|step| IdleSignal {
            step_id: step.id().clone(),
            entry: self.entry,
        });
        Arc::new(move || {
            if let Some(signal) = &signal {
                let _ = tx.send(signal.clone());
            }
        })
    }

    /// Re-evaluate the arming condition. `restart` forces a fresh deadline,
    /// as on step entry.
    fn sync_watchdog(&mut self, restart: bool) {
        let armed = self.should_arm();
        let timeout = self
            .current_step()
            .map(|step| self.policy.resolve(step))
            .unwrap_or_default();
        let callback = self.idle_callback();
        let was_armed = self.watchdog.is_enabled();

        self.watchdog.configure(timeout, callback, armed);
        if restart {
            self.watchdog.reset();
        }
        if armed != was_armed {
            debug!(armed, timeout_ms = timeout.as_millis(), "watchdog re-evaluated");
        }
    }
}

impl fmt::Debug for CaseSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseSession")
            .field("phase", &self.phase)
            .field("case_id", &self.case.as_ref().map(Case::id))
            .field("cursor", &self.cursor)
            .field("interaction", &self.interaction)
            .field("summary", &self.summary)
            .field("watchdog", &self.watchdog)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
