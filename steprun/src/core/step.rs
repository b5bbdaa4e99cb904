//! Named units of work and the narrow capability they execute.

use std::fmt;

use anyhow::Result;

/// A zero-argument operation that either completes or fails.
///
/// Sub-process, filesystem and network effects implement this in [`crate::io`];
/// the runner only ever sees the trait.
pub trait Action {
    fn run(&self) -> Result<()>;
}

impl<F> Action for F
where
    F: Fn() -> Result<()>,
{
    fn run(&self) -> Result<()> {
        self()
    }
}

/// One named step of a sequential run.
///
/// Steps are built once and never mutated while a run is in progress.
pub struct Step {
    name: String,
    failure_hint: Option<String>,
    action: Box<dyn Action>,
}

impl Step {
    pub fn new(name: impl Into<String>, action: impl Action + 'static) -> Self {
        Self {
            name: name.into(),
            failure_hint: None,
            action: Box::new(action),
        }
    }

    /// Build a step from a closure.
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Result<()> + 'static,
    {
        Self::new(name, f)
    }

    /// Attach a human-readable hint printed ahead of the underlying error.
    #[must_use]
    pub fn with_failure_hint(mut self, hint: impl Into<String>) -> Self {
        self.failure_hint = Some(hint.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn failure_hint(&self) -> Option<&str> {
        self.failure_hint.as_deref()
    }

    pub(crate) fn execute(&self) -> Result<()> {
        self.action.run()
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("failure_hint", &self.failure_hint)
            .finish_non_exhaustive()
    }
}
