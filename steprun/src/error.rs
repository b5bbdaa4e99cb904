//! The two fatal error kinds a run can end with.

use std::fmt;

use crate::core::types::{RunResult, StepFailure};

/// Fatal run errors. Neither kind is retried.
///
/// Callers holding an `anyhow::Error` can recover the kind with
/// `err.downcast_ref::<RunError>()`.
#[derive(Debug)]
pub enum RunError {
    /// A named step's underlying effect failed.
    StepFailure(StepFailure),
    /// A required input could not be read before any step ran.
    PrerequisiteMissing {
        what: String,
        source: anyhow::Error,
    },
}

impl RunError {
    pub fn prerequisite(what: impl Into<String>, source: anyhow::Error) -> Self {
        Self::PrerequisiteMissing {
            what: what.into(),
            source,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StepFailure(failure) => write!(
                f,
                "step {} ({}) failed: {}",
                failure.position, failure.step_name, failure.message
            ),
            Self::PrerequisiteMissing { what, .. } => write!(f, "missing prerequisite: {what}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::StepFailure(_) => None,
            Self::PrerequisiteMissing { source, .. } => Some(&**source),
        }
    }
}

impl RunResult {
    /// Convert into a `Result`, surfacing a failure as [`RunError::StepFailure`].
    pub fn into_result(self) -> Result<(), RunError> {
        match self {
            Self::Success => Ok(()),
            Self::Failure(failure) => Err(RunError::StepFailure(failure)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn step_failure_names_the_step() {
        let err = RunResult::Failure(StepFailure {
            position: 2,
            step_name: "Test: eslint".to_string(),
            message: "Failed to run eslint.".to_string(),
        })
        .into_result()
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "step 2 (Test: eslint) failed: Failed to run eslint."
        );
    }

    #[test]
    fn prerequisite_downcasts_through_anyhow() {
        let err: anyhow::Error =
            RunError::prerequisite("release tag", anyhow!("read .hermesversion")).into();
        let kind = err.downcast_ref::<RunError>().expect("typed error");
        assert!(matches!(kind, RunError::PrerequisiteMissing { what, .. } if what == "release tag"));
        assert_eq!(err.to_string(), "missing prerequisite: release tag");
        assert_eq!(
            format!("{err:#}"),
            "missing prerequisite: release tag: read .hermesversion"
        );
    }

    #[test]
    fn success_converts_to_ok() {
        assert!(RunResult::Success.into_result().is_ok());
    }
}
