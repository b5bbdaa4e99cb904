//! Pipeline definitions stored in a TOML file (default `steprun.toml`).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::command::{DEFAULT_OUTPUT_LIMIT_BYTES, ExecOptions};

pub const DEFAULT_PIPELINE_FILE: &str = "steprun.toml";

/// A user-defined pipeline (TOML).
///
/// Steps run in file order. Missing fields default so that a file holding only
/// `[[step]]` entries is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineFile {
    /// Printed before the first step.
    pub title: Option<String>,
    /// Printed after the last step when every step succeeded.
    pub success_message: Option<String>,
    pub settings: Settings,
    #[serde(rename = "step")]
    pub steps: Vec<StepSpec>,
}

/// Sub-process supervision shared by every command and shell step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Per-command timeout in seconds. Absent means wait indefinitely.
    pub timeout_secs: Option<u64>,
    /// Capture sub-process output instead of streaming it.
    pub capture_output: bool,
    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            capture_output: false,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }
}

impl Settings {
    pub fn exec_options(&self) -> ExecOptions {
        ExecOptions {
            timeout: self.timeout_secs.map(Duration::from_secs),
            capture_output: self.capture_output,
            output_limit_bytes: self.output_limit_bytes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_hint: Option<String>,
    #[serde(flatten)]
    pub kind: StepKind,
}

/// What a configured step does. Relative paths resolve against the pipeline root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
    },
    Shell {
        script: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
    },
    Download {
        url: String,
        dest: PathBuf,
        #[serde(default)]
        overwrite: bool,
    },
    CopyDir {
        from: PathBuf,
        to: PathBuf,
    },
    RemoveDir {
        path: PathBuf,
    },
    MakeDir {
        path: PathBuf,
    },
}

impl PipelineFile {
    pub fn validate(&self) -> Result<()> {
        if self.settings.timeout_secs == Some(0) {
            return Err(anyhow!("settings.timeout_secs must be > 0"));
        }
        if self.settings.output_limit_bytes == 0 {
            return Err(anyhow!("settings.output_limit_bytes must be > 0"));
        }
        for (index, step) in self.steps.iter().enumerate() {
            let position = index + 1;
            if step.name.trim().is_empty() {
                return Err(anyhow!("step {position}: name must be non-empty"));
            }
            let blank = match &step.kind {
                StepKind::Command { program, .. } => program.trim().is_empty().then_some("program"),
                StepKind::Shell { script, .. } => script.trim().is_empty().then_some("script"),
                StepKind::Download { url, .. } => url.trim().is_empty().then_some("url"),
                StepKind::CopyDir { .. } | StepKind::RemoveDir { .. } | StepKind::MakeDir { .. } => {
                    None
                }
            };
            if let Some(field) = blank {
                return Err(anyhow!(
                    "step {position} ({}): {field} must be non-empty",
                    step.name
                ));
            }
        }
        Ok(())
    }
}

/// Load and validate a pipeline file.
pub fn load_pipeline(path: &Path) -> Result<PipelineFile> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let pipeline: PipelineFile =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    pipeline
        .validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(pipeline)
}

/// Atomically write a pipeline file to disk (temp file + rename).
pub fn write_pipeline(path: &Path, pipeline: &PipelineFile) -> Result<()> {
    pipeline.validate()?;
    let mut buf = toml::to_string_pretty(pipeline).context("serialize pipeline toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

/// Starter pipeline written by `steprun init`.
pub fn sample_pipeline() -> PipelineFile {
    PipelineFile {
        title: Some("Executing checks".to_string()),
        success_message: Some("All checks passed".to_string()),
        settings: Settings::default(),
        steps: vec![
            StepSpec {
                name: "Lint".to_string(),
                failure_hint: Some("Failed to run lint.".to_string()),
                kind: StepKind::Command {
                    program: "yarn".to_string(),
                    args: vec!["run".to_string(), "lint".to_string()],
                    cwd: None,
                    env: BTreeMap::new(),
                },
            },
            StepSpec {
                name: "Unit tests".to_string(),
                failure_hint: Some("Failed to run unit tests.".to_string()),
                kind: StepKind::Shell {
                    script: "yarn test --ci".to_string(),
                    cwd: None,
                    env: BTreeMap::from([("CI".to_string(), "1".to_string())]),
                },
            },
        ],
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp pipeline {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace pipeline {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
title = "Executing JavaScript tests"

[settings]
timeout_secs = 600
capture_output = true

[[step]]
name = "Test: eslint"
failure_hint = "Failed to run eslint."
kind = "command"
program = "yarn"
args = ["run", "lint"]
env = { CI = "1" }

[[step]]
name = "Fetch"
kind = "download"
url = "https://example.com/a.tar.gz"
dest = "tmp/a.tar.gz"

[[step]]
name = "Clean"
kind = "remove_dir"
path = "build"
"#;

    #[test]
    fn parses_steps_in_order() {
        let pipeline: PipelineFile = toml::from_str(EXAMPLE).expect("parse");
        pipeline.validate().expect("valid");

        assert_eq!(pipeline.title.as_deref(), Some("Executing JavaScript tests"));
        assert_eq!(pipeline.success_message, None);
        let names: Vec<&str> = pipeline.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Test: eslint", "Fetch", "Clean"]);
        assert!(matches!(
            &pipeline.steps[0].kind,
            StepKind::Command { program, args, env, .. }
                if program == "yarn" && args == &["run", "lint"] && env["CI"] == "1"
        ));
        assert!(matches!(
            &pipeline.steps[1].kind,
            StepKind::Download { overwrite: false, .. }
        ));

        let options = pipeline.settings.exec_options();
        assert_eq!(options.timeout, Some(Duration::from_secs(600)));
        assert!(options.capture_output);
        assert_eq!(options.output_limit_bytes, DEFAULT_OUTPUT_LIMIT_BYTES);
    }

    #[test]
    fn empty_file_is_an_empty_pipeline() {
        let pipeline: PipelineFile = toml::from_str("").expect("parse");
        pipeline.validate().expect("valid");
        assert!(pipeline.steps.is_empty());
        assert_eq!(pipeline.settings, Settings::default());
    }

    #[test]
    fn rejects_blank_program() {
        let pipeline: PipelineFile = toml::from_str(
            r#"
[[step]]
name = "Lint"
kind = "command"
program = " "
"#,
        )
        .expect("parse");
        let err = pipeline.validate().unwrap_err();
        assert_eq!(err.to_string(), "step 1 (Lint): program must be non-empty");
    }

    #[test]
    fn rejects_zero_timeout() {
        let pipeline = PipelineFile {
            settings: Settings {
                timeout_secs: Some(0),
                ..Settings::default()
            },
            ..PipelineFile::default()
        };
        assert!(pipeline.validate().is_err());
    }

    #[test]
    fn unknown_kind_fails_to_parse() {
        let parsed: Result<PipelineFile, _> = toml::from_str(
            r#"
[[step]]
name = "Deploy"
kind = "teleport"
"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn load_missing_file_fails() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_pipeline(&temp.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }

    #[test]
    fn sample_writes_then_loads() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("steprun.toml");
        let sample = sample_pipeline();
        write_pipeline(&path, &sample).expect("write");
        let loaded = load_pipeline(&path).expect("load");
        assert_eq!(loaded, sample);
    }
}
