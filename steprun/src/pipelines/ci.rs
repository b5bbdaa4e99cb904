//! JavaScript CI pipeline: codegen checks, lint, codegen builds, Jest, TypeScript.

use std::path::PathBuf;

use crate::core::step::Step;
use crate::io::command::{CommandAction, ExecOptions};
use crate::io::manifest::RenamePackage;

use super::Pipeline;

pub const DEFAULT_JEST_BINARY: &str = "./node_modules/.bin/jest";
pub const DEFAULT_YARN_BINARY: &str = "yarn";
pub const DEFAULT_MAX_WORKERS: u32 = 1;

/// Inputs for [`ci_pipeline`].
#[derive(Debug, Clone)]
pub struct CiOptions {
    /// Monorepo root; every command runs here.
    pub root: PathBuf,
    /// Jest worker count.
    pub max_workers: u32,
    pub jest_binary: String,
    pub yarn_binary: String,
    pub exec: ExecOptions,
}

impl Default for CiOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            max_workers: DEFAULT_MAX_WORKERS,
            jest_binary: DEFAULT_JEST_BINARY.to_string(),
            yarn_binary: DEFAULT_YARN_BINARY.to_string(),
            exec: ExecOptions::default(),
        }
    }
}

pub fn ci_pipeline(opts: &CiOptions) -> Pipeline {
    let yarn = |args: &[&str]| {
        CommandAction::new(&opts.yarn_binary, args.iter().copied())
            .current_dir(&opts.root)
            .with_options(opts.exec)
    };
    let jest = CommandAction::new(
        &opts.jest_binary,
        [
            format!("--maxWorkers={}", opts.max_workers),
            "--ci".to_string(),
            "--reporters=default".to_string(),
            "--reporters=jest-junit".to_string(),
        ],
    )
    .current_dir(&opts.root)
    .with_options(opts.exec);

    let steps = vec![
        Step::new(
            "Rewrite react-native package name",
            RenamePackage {
                manifest: opts.root.join("packages/react-native/package.json"),
                name: "react-native".to_string(),
            },
        )
        .with_failure_hint("Failed to rewrite react-native package name."),
        Step::new(
            "Test: feature flags codegen",
            yarn(&["run", "featureflags-check"]),
        )
        .with_failure_hint("Failed to run featureflags check."),
        Step::new("Test: eslint", yarn(&["run", "lint"]))
            .with_failure_hint("Failed to run eslint."),
        Step::new(
            "Test: Build @react-native/codegen",
            yarn(&["--cwd", "./packages/react-native-codegen", "run", "build"]),
        )
        .with_failure_hint("Failed to build @react-native/codegen."),
        Step::new(
            "Test: Build @react-native/codegen-typescript-test",
            yarn(&[
                "--cwd",
                "./packages/react-native-codegen-typescript-test",
                "run",
                "build",
            ]),
        )
        .with_failure_hint("Failed to build @react-native/codegen-typescript-test."),
        Step::new("Test: Jest", jest).with_failure_hint(
            "Failed to run JavaScript tests. Most likely the code is broken.",
        ),
        Step::new(
            "Test: TypeScript tests",
            yarn(&["run", "test-typescript-offline"]),
        )
        .with_failure_hint("Failed to run TypeScript tests."),
    ];

    Pipeline::new(steps).with_title("Executing JavaScript tests")
}
