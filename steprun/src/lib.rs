//! Sequential fail-fast step runner.
//!
//! A run is an ordered list of named steps executed one at a time; the first
//! failing step halts the run, and a finalization notice is always emitted.
//! The crate keeps a strict split:
//!
//! - **[`core`]**: Pure sequencing logic (steps, runner, finalization guard).
//!   No I/O, tested with fake steps.
//! - **[`io`]**: Side-effecting step actions (sub-processes, downloads,
//!   filesystem, manifests), the console reporter and pipeline config.
//!
//! [`pipelines`] composes the two into the runs exposed by the CLI.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipelines;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
