use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use case_core::model::{
    Case, CaseId, OptionId, ProgressEntry, Step, StepId, StepKind, StepOption, TimeoutOverride,
};
use case_core::time::fixed_clock;
use serde_json::{Value, json};
use services::{
    Advance, AnswerVerdict, CaseSession, IdlePolicy, IdleSignals, LearnerStats,
    ScriptedAuthority, SessionError, SessionPhase, SubmitOutcome,
};

fn info(id: &str) -> Step {
    Step::new(id, StepKind::Info, json!({ "text": "A 54-year-old with chest pain." }))
}

fn mcq(id: &str) -> Step {
    Step::new(id, StepKind::Mcq, json!({ "question": "Next best step?" })).with_options(vec![
        StepOption::new("A", "Serial troponins").with_feedback("Good call."),
        StepOption::new("B", "Discharge").with_feedback("Too early to discharge."),
    ])
}

async fn start(authority: &ScriptedAuthority, case_id: &str) -> (CaseSession, IdleSignals) {
    let (mut session, signals) = CaseSession::new(
        Arc::new(authority.clone()),
        fixed_clock(),
        IdlePolicy::default(),
    );
    session.load_case(&CaseId::new(case_id)).await.unwrap();
    (session, signals)
}

fn opt(id: &str) -> OptionId {
    OptionId::new(id)
}

#[tokio::test(start_paused = true)]
async fn scenario_a_retry_then_correct_unlocks_advance() {
    let case = Case::new("c1", "Chest pain", vec![info("s1"), mcq("m2")]).unwrap();
    let authority = ScriptedAuthority::new().with_case(case);
    let (mut session, _signals) = start(&authority, "c1").await;

    assert!(session.can_advance());
    assert_eq!(session.advance().unwrap(), Advance::Moved { index: 1 });
    assert!(!session.can_advance());
    assert!(session.watchdog().is_enabled());

    authority.push_verdict(AnswerVerdict::incorrect(None));
    assert_eq!(session.submit_answer(&opt("B")).await, SubmitOutcome::Incorrect);
    let view = session.view();
    assert_eq!(view.attempt, 1);
    assert_eq!(view.correct, Some(false));
    assert_eq!(view.feedback.as_deref(), Some("Too early to discharge."));
    assert!(view.can_retry);
    assert!(!view.can_advance);

    session.retry().unwrap();
    let view = session.view();
    assert_eq!(view.attempt, 2);
    assert_eq!(view.selected, None);
    assert_eq!(view.feedback, None);
    assert_eq!(view.correct, None);
    assert_eq!(view.step_index, 1);

    authority.push_verdict(AnswerVerdict::correct());
    assert_eq!(session.submit_answer(&opt("A")).await, SubmitOutcome::Correct);
    let view = session.view();
    assert_eq!(view.feedback, None);
    assert_eq!(view.correct, Some(true));
    assert!(view.can_advance);
    assert!(!view.can_retry);
    assert!(!session.watchdog().is_enabled());

    let sent = authority.submissions();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|s| s.submission.is_final_step));
    assert_eq!(sent[0].step_id, StepId::new("m2"));
    assert_eq!(sent[1].submission.attempt_number, 2);
    assert_eq!(sent[1].submission.selected_option_id, opt("A"));
}

#[tokio::test(start_paused = true)]
async fn scenario_b_hint_ineligible_step_never_requests_a_hint() {
    let step = mcq("m1").with_hint_eligible(false);
    let case = Case::new("c1", "No hints", vec![step]).unwrap();
    let authority = ScriptedAuthority::new()
        .with_case(case)
        .with_hint("m1", "Should never be fetched");
    let (session, mut signals) = start(&authority, "c1").await;

    assert!(!session.watchdog().is_enabled());
    let waited = tokio::time::timeout(Duration::from_secs(120), signals.recv()).await;
    assert!(waited.is_err());
    assert!(authority.hint_requests().is_empty());
    assert!(!session.view().hint_open);
}

#[tokio::test(start_paused = true)]
async fn scenario_c_review_mode_hydrates_and_never_gates() {
    let mut progress = HashMap::new();
    progress.insert(
        StepId::new("m1"),
        ProgressEntry {
            selected_option: Some(opt("B")),
            is_correct: Some(false),
        },
    );
    let case = Case::new("c1", "Reviewed", vec![mcq("m1"), info("s2")])
        .unwrap()
        .completed(true)
        .with_progress(progress);
    let authority = ScriptedAuthority::new()
        .with_case(case)
        .with_hint("m1", "Not in review");
    let (mut session, mut signals) = start(&authority, "c1").await;

    let view = session.view();
    assert!(view.review_mode);
    assert_eq!(view.selected, Some(opt("B")));
    assert_eq!(view.correct, Some(false));
    assert_eq!(view.feedback.as_deref(), Some("Too early to discharge."));
    assert!(view.can_advance);
    assert!(!view.can_retry);

    assert_eq!(session.submit_answer(&opt("A")).await, SubmitOutcome::Ignored);
    assert!(matches!(session.retry(), Err(SessionError::RetryNotAllowed)));
    assert!(tokio::time::timeout(Duration::from_secs(120), signals.recv()).await.is_err());
    assert!(authority.submissions().is_empty());
    assert!(authority.hint_requests().is_empty());

    assert_eq!(session.advance().unwrap(), Advance::Moved { index: 1 });
    assert_eq!(session.view().selected, None);
    assert_eq!(session.go_back().unwrap(), 0);
    assert_eq!(session.view().selected, Some(opt("B")));
}

#[tokio::test(start_paused = true)]
async fn scenario_d_override_timeout_fires_exactly_one_hint() {
    let step = mcq("m1").with_idle_timeout(Some(TimeoutOverride::Seconds(5.0)));
    let case = Case::new("c1", "Quick hint", vec![step]).unwrap();
    let authority = ScriptedAuthority::new()
        .with_case(case)
        .with_hint("m1", "Troponin rises over hours.");
    let (mut session, mut signals) = start(&authority, "c1").await;

    assert_eq!(session.watchdog().timeout(), Duration::from_secs(5));
    assert!(
        tokio::time::timeout(Duration::from_millis(4_900), signals.recv())
            .await
            .is_err()
    );

    let signal = signals.recv().await.unwrap();
    assert!(session.on_idle_fired(signal).await);
    assert_eq!(authority.hint_requests(), vec![StepId::new("m1")]);

    let view = session.view();
    assert!(view.hint_open);
    assert_eq!(view.hint.as_deref(), Some("Troponin rises over hours."));
    assert!(!session.watchdog().is_enabled());
    assert!(tokio::time::timeout(Duration::from_secs(60), signals.recv()).await.is_err());
    assert_eq!(authority.hint_requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn hint_fires_once_per_entry_until_retry() {
    let case = Case::new("c1", "Hints", vec![mcq("m1")]).unwrap();
    let authority = ScriptedAuthority::new()
        .with_case(case)
        .with_hint("m1", "Consider the timing.");
    let (mut session, mut signals) = start(&authority, "c1").await;

    let first = signals.recv().await.unwrap();
    assert!(session.on_idle_fired(first).await);

    // Closing the surface re-arms the watchdog, but the step already had its hint.
    session.dismiss_hint();
    assert!(session.watchdog().is_enabled());
    let second = signals.recv().await.unwrap();
    assert!(!session.on_idle_fired(second).await);
    assert_eq!(authority.hint_requests().len(), 1);

    authority.push_verdict(AnswerVerdict::incorrect(Some("Not yet.")));
    session.submit_answer(&opt("B")).await;
    assert_eq!(session.view().feedback.as_deref(), Some("Not yet."));

    session.retry().unwrap();
    let third = signals.recv().await.unwrap();
    assert!(session.on_idle_fired(third).await);
    assert_eq!(authority.hint_requests().len(), 2);

    authority.push_verdict(AnswerVerdict::correct());
    session.submit_answer(&opt("A")).await;
    let sent = authority.submissions();
    assert!(sent[0].submission.hint_shown);
    assert!(sent[1].submission.hint_shown);
}

#[tokio::test(start_paused = true)]
async fn hint_failures_and_empty_hints_are_silent() {
    let case = Case::new("c1", "Quiet", vec![mcq("m1"), mcq("m2")]).unwrap();
    let authority = ScriptedAuthority::new()
        .with_case(case)
        .with_hint_failure("m1", "hint service down");
    let (mut session, mut signals) = start(&authority, "c1").await;

    let signal = signals.recv().await.unwrap();
    assert!(!session.on_idle_fired(signal).await);
    let view = session.view();
    assert!(!view.hint_open);
    assert_eq!(view.feedback, None);
    assert_eq!(view.phase, SessionPhase::Ready);

    session.select_step(1);
    let signal = signals.recv().await.unwrap();
    assert!(!session.on_idle_fired(signal).await);
    assert!(!session.view().hint_open);
    assert_eq!(authority.hint_requests().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn step_entry_resets_interaction_and_restores_saved_progress() {
    let mut progress = HashMap::new();
    progress.insert(
        StepId::new("m2"),
        ProgressEntry {
            selected_option: Some(opt("A")),
            is_correct: Some(true),
        },
    );
    let case = Case::new("c1", "Resume", vec![mcq("m1"), mcq("m2"), info("s3")])
        .unwrap()
        .with_progress(progress);
    let authority = ScriptedAuthority::new()
        .with_case(case)
        .with_hint("m1", "Hint for m1");
    let (mut session, mut signals) = start(&authority, "c1").await;

    let signal = signals.recv().await.unwrap();
    assert!(session.on_idle_fired(signal).await);
    authority.push_verdict(AnswerVerdict::incorrect(None));
    session.submit_answer(&opt("B")).await;
    session.retry().unwrap();
    assert_eq!(session.view().attempt, 2);

    // Re-entering the same step starts over.
    session.select_step(0);
    let view = session.view();
    assert_eq!(view.attempt, 1);
    assert!(!view.hint_open);
    assert_eq!(view.hint, None);
    assert!(!session.interaction().hint_shown);
    assert_eq!(view.selected, None);

    // Saved progress is restored verbatim on every entry.
    session.select_step(1);
    assert_eq!(session.view().selected, Some(opt("A")));
    assert_eq!(session.view().correct, Some(true));
    assert!(session.can_advance());
    assert!(!session.watchdog().is_enabled());

    session.advance().unwrap();
    session.go_back().unwrap();
    let view = session.view();
    assert_eq!(view.attempt, 1);
    assert_eq!(view.selected, Some(opt("A")));
    assert!(!view.hint_open);
}

#[tokio::test]
async fn can_advance_follows_the_gate_for_every_combination() {
    let selections = [None, Some(opt("A"))];
    let verdicts = [None, Some(true), Some(false)];

    for completed in [false, true] {
        let mut steps = Vec::new();
        let mut progress = HashMap::new();
        let mut expected = Vec::new();
        for kind in [StepKind::Mcq, StepKind::Investigation] {
            for selection in &selections {
                for verdict in verdicts {
                    let id = format!("s{}", steps.len());
                    let step = Step::new(id.as_str(), kind.clone(), Value::Null)
                        .with_options(vec![StepOption::new("A", "Only")]);
                    progress.insert(
                        StepId::new(id.as_str()),
                        ProgressEntry {
                            selected_option: selection.clone(),
                            is_correct: verdict,
                        },
                    );
                    expected.push(
                        completed
                            || kind != StepKind::Mcq
                            || (selection.is_some() && verdict == Some(true)),
                    );
                    steps.push(step);
                }
            }
        }

        let case = Case::new("grid", "Gate", steps)
            .unwrap()
            .completed(completed)
            .with_progress(progress);
        let authority = ScriptedAuthority::new().with_case(case);
        let (mut session, _signals) = start(&authority, "grid").await;

        for (index, want) in expected.into_iter().enumerate() {
            session.select_step(index);
            assert_eq!(
                session.can_advance(),
                want,
                "step {index} completed={completed}"
            );
        }
    }
}

#[tokio::test(start_paused = true)]
async fn final_correct_answer_completes_the_session() {
    let case = Case::new("c1", "Finale", vec![info("s1"), mcq("m2")]).unwrap();
    let authority = ScriptedAuthority::new().with_case(case);
    let (mut session, _signals) = start(&authority, "c1").await;
    session.advance().unwrap();

    authority.push_verdict(AnswerVerdict::finished(
        80.0,
        LearnerStats {
            cases_completed: 5,
            total_score: 410.0,
        },
    ));
    assert_eq!(session.submit_answer(&opt("A")).await, SubmitOutcome::Finished);
    assert_eq!(session.phase(), &SessionPhase::Completed);

    let summary = session.summary().cloned().unwrap();
    assert_eq!(summary.score, 80.0);
    assert_eq!(summary.cases_completed, 5);
    assert_eq!(summary.total_score, 410.0);

    assert_eq!(session.advance().unwrap(), Advance::Finished(summary.clone()));
    assert_eq!(session.advance().unwrap(), Advance::Finished(summary));
    assert!(matches!(session.go_back(), Err(SessionError::NotReady)));
    assert_eq!(session.select_step(0), 1);
    assert_eq!(session.submit_answer(&opt("A")).await, SubmitOutcome::Ignored);
    assert!(!session.watchdog().is_enabled());
    assert_eq!(authority.submissions().len(), 1);
}

#[tokio::test]
async fn load_failure_blocks_the_session() {
    let authority = ScriptedAuthority::new().failing_loads("authority unavailable");
    let (mut session, _signals) = CaseSession::new(
        Arc::new(authority.clone()),
        fixed_clock(),
        IdlePolicy::default(),
    );

    let err = session.load_case(&CaseId::new("c1")).await.unwrap_err();
    assert!(matches!(err, SessionError::Load(ref m) if m == "authority unavailable"));
    assert_eq!(session.failure(), Some("authority unavailable"));
    assert!(session.case().is_none());
    assert!(session.current_step().is_none());
    assert!(!session.can_advance());
    assert!(matches!(session.advance(), Err(SessionError::NotReady)));
    assert_eq!(session.submit_answer(&opt("A")).await, SubmitOutcome::Ignored);
}

#[tokio::test]
async fn unknown_case_reports_not_found() {
    let authority = ScriptedAuthority::new();
    let (mut session, _signals) = CaseSession::new(
        Arc::new(authority),
        fixed_clock(),
        IdlePolicy::default(),
    );
    session.load_case(&CaseId::new("missing")).await.unwrap_err();
    assert_eq!(session.failure(), Some("case missing not found"));
}

#[tokio::test(start_paused = true)]
async fn submission_failure_reads_as_incorrect_answer() {
    let case = Case::new("c1", "Flaky", vec![mcq("m1")]).unwrap();
    let authority = ScriptedAuthority::new().with_case(case);
    let (mut session, _signals) = start(&authority, "c1").await;

    authority.push_rejection("Option does not belong to this step");
    assert_eq!(session.submit_answer(&opt("Z")).await, SubmitOutcome::Incorrect);
    let view = session.view();
    assert_eq!(view.correct, Some(false));
    assert_eq!(view.feedback.as_deref(), Some("Option does not belong to this step"));
    assert!(view.can_retry);

    session.retry().unwrap();
    // Nothing queued: the double reports an error, still surfaced as feedback.
    assert_eq!(session.submit_answer(&opt("A")).await, SubmitOutcome::Incorrect);
    assert_eq!(
        session.view().feedback.as_deref(),
        Some("no scripted verdict available")
    );
}

#[tokio::test]
async fn guard_no_ops_and_navigation_limits() {
    let case = Case::new("c1", "Guards", vec![mcq("m1"), info("s2")]).unwrap();
    let authority = ScriptedAuthority::new().with_case(case);
    let (mut session, _signals) = start(&authority, "c1").await;

    assert_eq!(session.submit_answer(&opt("")).await, SubmitOutcome::Ignored);
    assert!(matches!(session.go_back(), Err(SessionError::AtFirstStep)));
    assert!(matches!(session.advance(), Err(SessionError::Locked)));
    assert!(matches!(session.retry(), Err(SessionError::RetryNotAllowed)));

    assert_eq!(session.select_step(1), 1);
    assert!(matches!(session.advance(), Err(SessionError::AtLastStep)));
    assert!(authority.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn time_on_step_keeps_counting_after_the_gate_opens_and_restarts_per_step() {
    let case = Case::new("c1", "Timers", vec![mcq("m1"), info("s2")]).unwrap();
    let authority = ScriptedAuthority::new().with_case(case);
    let (mut session, _signals) = start(&authority, "c1").await;

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(session.view().elapsed_seconds, 10);

    authority.push_verdict(AnswerVerdict::correct());
    assert_eq!(session.submit_answer(&opt("A")).await, SubmitOutcome::Correct);
    assert!(!session.watchdog().is_enabled());
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(session.view().elapsed_seconds, 13);

    assert_eq!(session.advance().unwrap(), Advance::Moved { index: 1 });
    assert_eq!(session.view().elapsed_seconds, 0);
    tokio::time::sleep(Duration::from_millis(20_500)).await;
    assert_eq!(session.view().elapsed_seconds, 20);
    assert!(!session.watchdog().is_armed());
}
