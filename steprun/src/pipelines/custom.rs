//! Pipelines built from a user's TOML file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::step::Step;
use crate::error::RunError;
use crate::io::command::{CommandAction, ExecOptions};
use crate::io::config::{PipelineFile, StepKind, StepSpec, load_pipeline};
use crate::io::fetch::DownloadAction;
use crate::io::files::{CopyDir, MakeDir, RemoveDir};

use super::{Pipeline, resolve};

/// Load `path` and build its pipeline, resolving relative paths against `root`.
///
/// An unreadable or invalid file is a missing prerequisite: no step has run yet.
pub fn load(root: &Path, path: &Path) -> Result<Pipeline, RunError> {
    let file = load_pipeline(path)
        .map_err(|err| RunError::prerequisite(format!("pipeline file {}", path.display()), err))?;
    Ok(from_file(root, &file))
}

pub fn from_file(root: &Path, file: &PipelineFile) -> Pipeline {
    let exec = file.settings.exec_options();
    let steps = file
        .steps
        .iter()
        .map(|spec| build_step(root, spec, exec))
        .collect();
    let mut pipeline = Pipeline::new(steps);
    if let Some(title) = &file.title {
        pipeline = pipeline.with_title(title);
    }
    if let Some(message) = &file.success_message {
        pipeline = pipeline.with_success_message(message);
    }
    pipeline
}

fn build_step(root: &Path, spec: &StepSpec, exec: ExecOptions) -> Step {
    let step = match &spec.kind {
        StepKind::Command {
            program,
            args,
            cwd,
            env,
        } => Step::new(
            &spec.name,
            command(CommandAction::new(program, args), root, cwd.as_deref(), env, exec),
        ),
        StepKind::Shell { script, cwd, env } => Step::new(
            &spec.name,
            command(CommandAction::shell(script), root, cwd.as_deref(), env, exec),
        ),
        StepKind::Download {
            url,
            dest,
            overwrite,
        } => Step::new(
            &spec.name,
            DownloadAction::new(url, resolve(root, dest)).overwrite(*overwrite),
        ),
        StepKind::CopyDir { from, to } => Step::new(
            &spec.name,
            CopyDir {
                from: resolve(root, from),
                to: resolve(root, to),
            },
        ),
        StepKind::RemoveDir { path } => Step::new(
            &spec.name,
            RemoveDir {
                path: resolve(root, path),
            },
        ),
        StepKind::MakeDir { path } => Step::new(
            &spec.name,
            MakeDir {
                path: resolve(root, path),
            },
        ),
    };
    match &spec.failure_hint {
        Some(hint) => step.with_failure_hint(hint),
        None => step,
    }
}

fn command(
    action: CommandAction,
    root: &Path,
    cwd: Option<&Path>,
    env: &BTreeMap<String, String>,
    exec: ExecOptions,
) -> CommandAction {
    let dir: PathBuf = cwd.map_or_else(|| root.to_path_buf(), |cwd| resolve(root, cwd));
    env.iter()
        .fold(action.current_dir(dir), |action, (key, value)| {
            action.env(key, value)
        })
        .with_options(exec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingReporter;
    use std::fs;

    fn parse(toml_text: &str) -> PipelineFile {
        let file: PipelineFile = toml::from_str(toml_text).expect("parse");
        file.validate().expect("valid");
        file
    }

    #[test]
    fn builds_named_steps_with_hints() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = parse(
            r#"
title = "Checks"

[[step]]
name = "Prepare"
kind = "make_dir"
path = "out"

[[step]]
name = "Write"
failure_hint = "Failed to write."
kind = "shell"
script = "printf '%s' \"$GREETING\" > out/hello.txt"
env = { GREETING = "hi" }
"#,
        );

        let pipeline = from_file(temp.path(), &file);

        assert_eq!(pipeline.title(), Some("Checks"));
        assert_eq!(pipeline.step_names(), vec!["Prepare", "Write"]);
        assert_eq!(pipeline.steps()[1].failure_hint(), Some("Failed to write."));

        let result = pipeline.run(&mut RecordingReporter::default());
        assert!(result.is_success(), "{result:?}");
        assert_eq!(
            fs::read_to_string(temp.path().join("out/hello.txt")).expect("read"),
            "hi"
        );
    }

    #[test]
    fn stops_at_failing_command() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = parse(
            r#"
[[step]]
name = "A"
kind = "shell"
script = "touch a"

[[step]]
name = "B"
kind = "command"
program = "sh"
args = ["-c", "exit 1"]

[[step]]
name = "C"
kind = "shell"
script = "touch c"
"#,
        );

        let result = from_file(temp.path(), &file).run(&mut RecordingReporter::default());

        let failure = result.failure().expect("failure");
        assert_eq!(failure.step_name, "B");
        assert_eq!(failure.position, 2);
        assert!(temp.path().join("a").exists());
        assert!(!temp.path().join("c").exists());
    }

    #[test]
    fn command_cwd_is_relative_to_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("pkg")).expect("mkdir");
        let file = parse(
            r#"
[[step]]
name = "Touch"
kind = "shell"
script = "touch marker"
cwd = "pkg"
"#,
        );

        let result = from_file(temp.path(), &file).run(&mut RecordingReporter::default());

        assert!(result.is_success());
        assert!(temp.path().join("pkg/marker").exists());
    }

    #[test]
    fn unreadable_file_is_missing_prerequisite() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load(temp.path(), &temp.path().join("steprun.toml")).unwrap_err();
        assert!(matches!(err, RunError::PrerequisiteMissing { .. }));
    }
}
