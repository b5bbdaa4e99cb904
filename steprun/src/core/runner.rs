//! Sequential fail-fast execution of an ordered step list.

use std::time::Instant;

use tracing::{debug, info, warn};

use super::finally::Finally;
use super::report::Reporter;
use super::step::Step;
use super::types::{RunResult, StepFailure};

/// Executes steps one at a time, halting on the first failure.
///
/// The title and success line are optional decorations reported inside the
/// same finalization scope as the steps.
#[derive(Debug, Clone, Default)]
pub struct Runner {
    title: Option<String>,
    success_message: Option<String>,
}

impl Runner {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = Some(message.into());
        self
    }

    /// Run `steps` strictly in order.
    ///
    /// `reporter.finished()` is called exactly once when this returns, including
    /// when a step panics and the stack unwinds through here.
    pub fn run<R: Reporter + ?Sized>(&self, steps: &[Step], reporter: &mut R) -> RunResult {
        let mut reporter = Finally::new(reporter, |r: &mut &mut R| r.finished());
        if let Some(title) = &self.title {
            reporter.run_started(title);
        }

        let result = execute(steps, &mut **reporter);

        if result.is_success()
            && let Some(message) = &self.success_message
        {
            reporter.succeeded(message);
        }
        result
    }
}

/// Run `steps` with no title or success line.
pub fn run_steps<R: Reporter + ?Sized>(steps: &[Step], reporter: &mut R) -> RunResult {
    Runner::new().run(steps, reporter)
}

fn execute<R: Reporter + ?Sized>(steps: &[Step], reporter: &mut R) -> RunResult {
    let total = steps.len();
    for (index, step) in steps.iter().enumerate() {
        let position = index + 1;
        reporter.step_started(position, total, step.name());
        info!(step = step.name(), position, total, "step started");

        let started = Instant::now();
        if let Err(err) = step.execute() {
            let message = match step.failure_hint() {
                Some(hint) => format!("{hint} ({err:#})"),
                None => format!("{err:#}"),
            };
            warn!(step = step.name(), position, err = %message, "step failed, halting run");
            let failure = StepFailure {
                position,
                step_name: step.name().to_string(),
                message,
            };
            reporter.step_failed(&failure);
            return RunResult::Failure(failure);
        }
        debug!(
            step = step.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "step completed"
        );
    }
    RunResult::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Event, RecordingReporter, StepLog, failing, panicking, succeeding};
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[test]
    fn empty_sequence_succeeds_with_only_finalization() {
        let mut reporter = RecordingReporter::default();
        let result = run_steps(&[], &mut reporter);
        assert_eq!(result, RunResult::Success);
        assert_eq!(result.exit_code(), 0);
        assert_eq!(reporter.events, vec![Event::Finished]);
    }

    #[test]
    fn all_success_runs_every_step_in_order() {
        let log = StepLog::default();
        let steps = vec![
            succeeding("A", &log),
            succeeding("B", &log),
            succeeding("C", &log),
        ];
        let mut reporter = RecordingReporter::default();

        let result = run_steps(&steps, &mut reporter);

        assert_eq!(result, RunResult::Success);
        assert_eq!(log.ran(), vec!["A", "B", "C"]);
        assert_eq!(reporter.started_names(), vec!["A", "B", "C"]);
        assert_eq!(reporter.finished_count(), 1);
    }

    #[test]
    fn failure_halts_before_later_steps() {
        let log = StepLog::default();
        let steps = vec![
            succeeding("A", &log),
            succeeding("B", &log),
            failing("C", &log, "exit status 1"),
            succeeding("D", &log),
        ];
        let mut reporter = RecordingReporter::default();

        let result = run_steps(&steps, &mut reporter);

        let failure = result.failure().expect("failure");
        assert_eq!(failure.position, 3);
        assert_eq!(failure.step_name, "C");
        assert_eq!(failure.message, "exit status 1");
        assert_eq!(result.exit_code(), 1);
        assert_eq!(log.ran(), vec!["A", "B", "C"]);
        assert_eq!(reporter.started_names(), vec!["A", "B", "C"]);
        assert_eq!(reporter.finished_count(), 1);
        assert!(matches!(reporter.events.last(), Some(Event::Finished)));
    }

    #[test]
    fn first_step_failure_reports_position_one() {
        let log = StepLog::default();
        let steps = vec![failing("only", &log, "nope"), succeeding("never", &log)];
        let mut reporter = RecordingReporter::default();

        let result = run_steps(&steps, &mut reporter);

        assert_eq!(result.failure().map(|f| f.position), Some(1));
        assert_eq!(log.ran(), vec!["only"]);
    }

    #[test]
    fn failure_hint_prefixes_message() {
        let log = StepLog::default();
        let steps = vec![failing("lint", &log, "yarn exited with 1").with_failure_hint("Failed to run eslint.")];
        let mut reporter = RecordingReporter::default();

        let result = run_steps(&steps, &mut reporter);

        assert_eq!(
            result.failure().map(|f| f.message.as_str()),
            Some("Failed to run eslint. (yarn exited with 1)")
        );
        assert!(
            reporter
                .events
                .iter()
                .any(|e| matches!(e, Event::Failed(f) if f.step_name == "lint"))
        );
    }

    #[test]
    fn title_and_success_line_wrap_steps() {
        let log = StepLog::default();
        let steps = vec![succeeding("A", &log)];
        let mut reporter = RecordingReporter::default();

        let result = Runner::new()
            .with_title("Executing checks")
            .with_success_message("all good")
            .run(&steps, &mut reporter);

        assert!(result.is_success());
        assert_eq!(
            reporter.events,
            vec![
                Event::RunStarted("Executing checks".to_string()),
                Event::StepStarted(1, 1, "A".to_string()),
                Event::Succeeded("all good".to_string()),
                Event::Finished,
            ]
        );
    }

    #[test]
    fn success_line_skipped_on_failure() {
        let log = StepLog::default();
        let steps = vec![failing("A", &log, "bad")];
        let mut reporter = RecordingReporter::default();

        Runner::new()
            .with_success_message("all good")
            .run(&steps, &mut reporter);

        assert!(
            !reporter
                .events
                .iter()
                .any(|e| matches!(e, Event::Succeeded(_)))
        );
        assert_eq!(reporter.finished_count(), 1);
    }

    #[test]
    fn finalization_runs_once_when_step_panics() {
        let log = StepLog::default();
        let steps = vec![succeeding("A", &log), panicking("B"), succeeding("C", &log)];
        let mut reporter = RecordingReporter::default();

        let outcome = catch_unwind(AssertUnwindSafe(|| run_steps(&steps, &mut reporter)));

        assert!(outcome.is_err());
        assert_eq!(log.ran(), vec!["A"]);
        assert_eq!(reporter.finished_count(), 1);
    }
}
