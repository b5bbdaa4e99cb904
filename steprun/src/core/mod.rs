//! Pure sequencing logic for the step runner.
//!
//! Core modules do no I/O of their own. Effects reach them only through the
//! [`step::Action`] and [`report::Reporter`] traits, which keeps the runner
//! testable with fake steps.

pub mod finally;
pub mod report;
pub mod runner;
pub mod step;
pub mod types;
