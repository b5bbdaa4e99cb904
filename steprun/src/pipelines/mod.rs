//! Pipelines: ordered steps plus the metadata and scratch space a run needs.
//!
//! Builders resolve every prerequisite before returning, so a [`Pipeline`]
//! that exists is ready to run.

pub mod ci;
pub mod custom;
pub mod release;

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::report::Reporter;
use crate::core::runner::Runner;
use crate::core::step::Step;
use crate::core::types::RunResult;

/// An ordered step list ready to run.
///
/// Scratch directories are removed when the pipeline is dropped.
#[derive(Debug, Default)]
pub struct Pipeline {
    title: Option<String>,
    success_message: Option<String>,
    steps: Vec<Step>,
    scratch: Vec<TempDir>,
}

impl Pipeline {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
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

    /// Keep `dir` alive for as long as the pipeline exists.
    #[must_use]
    pub fn holding(mut self, dir: TempDir) -> Self {
        self.scratch.push(dir);
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn success_message(&self) -> Option<&str> {
        self.success_message.as_deref()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(Step::name).collect()
    }

    pub fn run<R: Reporter + ?Sized>(&self, reporter: &mut R) -> RunResult {
        let mut runner = Runner::new();
        if let Some(title) = &self.title {
            runner = runner.with_title(title);
        }
        if let Some(message) = &self.success_message {
            runner = runner.with_success_message(message);
        }
        runner.run(&self.steps, reporter)
    }
}

/// Resolve `path` against `root` unless it is already absolute.
pub(crate) fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Event, RecordingReporter, StepLog, failing, succeeding};

    #[test]
    fn run_reports_title_and_success() {
        let log = StepLog::default();
        let pipeline = Pipeline::new(vec![succeeding("A", &log), succeeding("B", &log)])
            .with_title("Checks")
            .with_success_message("done");
        let mut reporter = RecordingReporter::default();

        let result = pipeline.run(&mut reporter);

        assert!(result.is_success());
        assert_eq!(pipeline.step_names(), vec!["A", "B"]);
        assert_eq!(reporter.events.first(), Some(&Event::RunStarted("Checks".to_string())));
        assert_eq!(
            &reporter.events[reporter.events.len() - 2..],
            &[Event::Succeeded("done".to_string()), Event::Finished]
        );
    }

    #[test]
    fn scratch_dirs_live_until_drop() {
        let log = StepLog::default();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().to_path_buf();
        let pipeline = Pipeline::new(vec![failing("A", &log, "bad")]).holding(dir);

        let result = pipeline.run(&mut RecordingReporter::default());

        assert_eq!(result.exit_code(), 1);
        assert!(path.exists());
        drop(pipeline);
        assert!(!path.exists());
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let root = Path::new("/work");
        assert_eq!(resolve(root, Path::new("a/b")), PathBuf::from("/work/a/b"));
        assert_eq!(resolve(root, Path::new("/tmp/x")), PathBuf::from("/tmp/x"));
    }
}
