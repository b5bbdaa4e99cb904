//! Stable exit codes for steprun CLI commands.

/// Every step completed.
pub const OK: i32 = 0;
/// A step failed, a prerequisite was missing, or the pipeline was invalid.
pub const FAILED: i32 = 1;
