//! Outcome types shared by the runner and its callers.

use crate::exit_codes;

/// Details of the step that halted a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    /// 1-indexed position of the failed step in the sequence.
    pub position: usize,
    pub step_name: String,
    /// Failure hint (if any) followed by the underlying error chain.
    pub message: String,
}

/// Overall outcome of a sequential run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    /// Every step completed.
    Success,
    /// A step failed; later steps never ran.
    Failure(StepFailure),
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn failure(&self) -> Option<&StepFailure> {
        match self {
            Self::Success => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success => exit_codes::OK,
            Self::Failure(_) => exit_codes::FAILED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_outcome() {
        assert_eq!(RunResult::Success.exit_code(), 0);
        let failed = RunResult::Failure(StepFailure {
            position: 3,
            step_name: "C".to_string(),
            message: "boom".to_string(),
        });
        assert_eq!(failed.exit_code(), 1);
        assert!(!failed.is_success());
        assert_eq!(failed.failure().map(|f| f.position), Some(3));
    }
}
