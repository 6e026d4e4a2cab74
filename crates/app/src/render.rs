use case_core::adapters::{self, format_clock, summary_lines};
use case_core::model::{Step, StepKind};
use services::{CaseSession, SessionPhase, SessionView};

/// Lines for the current step, chosen by step kind.
fn step_lines(step: &Step, view: &SessionView) -> Vec<String> {
    let rendered = match step.kind() {
        StepKind::Info => adapters::brief(step).map(|v| v.lines()),
        StepKind::History => adapters::history(step).map(|v| v.lines()),
        StepKind::Investigation => adapters::investigation(step).map(|v| v.lines()),
        _ if !step.options().is_empty() || step.kind().is_gated() => {
            adapters::mcq(step, view.selected.as_ref(), view.correct).map(|v| v.lines())
        }
        _ => adapters::brief(step).map(|v| v.lines()),
    };
    rendered.unwrap_or_else(|err| vec![format!("(this step could not be displayed: {err})")])
}

/// Full transcript block for the session's current state.
#[must_use]
pub fn screen(session: &CaseSession) -> String {
    let view = session.view();
    let mut out = Vec::new();

    match &view.phase {
        SessionPhase::Loading => out.push("Loading case...".to_string()),
        SessionPhase::Failed(message) => out.push(format!("Could not load case: {message}")),
        SessionPhase::Completed => {
            out.push("Case complete.".to_string());
            if let Some(summary) = &view.summary {
                out.extend(summary_lines(summary));
            }
        }
        SessionPhase::Ready => {
            let title = view.title.clone().unwrap_or_default();
            let mode = if view.review_mode { " (review)" } else { "" };
            out.push(format!(
                "== {title}{mode}: step {}/{} [{}%] ==",
                view.step_index + 1,
                view.step_count,
                view.progress_percent
            ));
            if let Some(step) = session.current_step() {
                if let Some(heading) = step.title() {
                    out.push(heading.to_string());
                }
                out.extend(step_lines(step, &view));
            }
            if let Some(feedback) = &view.feedback {
                out.push(format!("Feedback: {feedback}"));
            }
            if view.hint_open {
                if let Some(hint) = &view.hint {
                    out.push(format!("Hint: {hint}  (h to close)"));
                }
            }
            if view.attempt > 1 {
                out.push(format!("Attempt {}", view.attempt));
            }
            if view.elapsed_seconds > 0 {
                out.push(format!("Time on step: {}", format_clock(view.elapsed_seconds)));
            }
            out.push(actions(&view));
        }
    }
    out.join("\n")
}

fn actions(view: &SessionView) -> String {
    let mut available = Vec::new();
    if view.can_go_back {
        available.push("b back");
    }
    if view.can_advance && view.step_index + 1 < view.step_count {
        available.push("n next");
    }
    if view.can_retry {
        available.push("r retry");
    }
    available.push("? help");
    format!("[{}]", available.join(" | "))
}
