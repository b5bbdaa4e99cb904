//! Progress reporting seam between the runner and its output surface.

use super::types::StepFailure;

/// Receives progress notices from a run.
///
/// Implementations decide where notices go (console, memory in tests). The
/// runner calls `finished` exactly once per run, after every other notice.
pub trait Reporter {
    /// A titled run is about to execute its first step.
    fn run_started(&mut self, title: &str);

    /// Step `position` (1-indexed) of `total` is about to execute.
    fn step_started(&mut self, position: usize, total: usize, name: &str);

    /// A step failed and the run is halting.
    fn step_failed(&mut self, failure: &StepFailure);

    /// Every step completed; `message` is the run's success line.
    fn succeeded(&mut self, message: &str);

    /// Finalization notice.
    fn finished(&mut self);
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn run_started(&mut self, title: &str) {
        (**self).run_started(title);
    }

    fn step_started(&mut self, position: usize, total: usize, name: &str) {
        (**self).step_started(position, total, name);
    }

    fn step_failed(&mut self, failure: &StepFailure) {
        (**self).step_failed(failure);
    }

    fn succeeded(&mut self, message: &str) {
        (**self).succeeded(message);
    }

    fn finished(&mut self) {
        (**self).finished();
    }
}
