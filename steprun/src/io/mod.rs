//! Side-effecting step actions and output surfaces.

pub mod command;
pub mod config;
pub mod console;
pub mod fetch;
pub mod files;
pub mod manifest;
pub mod process;
