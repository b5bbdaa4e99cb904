//! Step action that runs an external program and treats non-zero exit as failure.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument};

use crate::core::step::Action;
use crate::io::process::{run_command_captured, run_command_inherited};

pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 100_000;

/// Bytes of captured stderr quoted in a failure message.
const STDERR_TAIL_BYTES: usize = 2_000;

/// How sub-processes are supervised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    /// Kill the child after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Capture stdout/stderr instead of streaming them to the console.
    pub capture_output: bool,
    /// Cap on captured bytes per stream.
    pub output_limit_bytes: usize,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            capture_output: false,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }
}

/// Runs `program args...` as an opaque sub-process.
#[derive(Debug, Clone)]
pub struct CommandAction {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    options: ExecOptions,
}

impl CommandAction {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            env: Vec::new(),
            options: ExecOptions::default(),
        }
    }

    /// Run `script` through `sh -c`.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh", ["-c".to_string(), script.into()])
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: ExecOptions) -> Self {
        self.options = options;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Human-readable command line for messages.
    pub fn describe(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }
}

impl Action for CommandAction {
    #[instrument(skip_all, fields(command = %self.describe()))]
    fn run(&self) -> Result<()> {
        info!(cwd = ?self.cwd, capture = self.options.capture_output, "running command");
        let line = self.describe();

        if !self.options.capture_output {
            let done = run_command_inherited(self.build(), self.options.timeout)?;
            if done.timed_out {
                return Err(timed_out(&line, self.options.timeout));
            }
            return check_status(&line, done.status, "");
        }

        let output = run_command_captured(
            self.build(),
            self.options.timeout,
            self.options.output_limit_bytes,
        )?;
        debug!(
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "captured command output"
        );
        if output.timed_out {
            return Err(timed_out(&line, self.options.timeout));
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail = format!(
            "{}{}",
            tail_of(stderr.trim_end(), STDERR_TAIL_BYTES),
            output.stderr_truncated_notice(&self.program)
        );
        check_status(&line, output.status, tail.trim_end())
    }
}

fn timed_out(line: &str, timeout: Option<Duration>) -> anyhow::Error {
    let limit = timeout.unwrap_or_default();
    anyhow!("`{line}` timed out after {limit:?}")
}

fn check_status(line: &str, status: ExitStatus, stderr_tail: &str) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    let how = match status.code() {
        Some(code) => format!("exited with status {code}"),
        None => "was terminated by a signal".to_string(),
    };
    if stderr_tail.is_empty() {
        Err(anyhow!("`{line}` {how}"))
    } else {
        Err(anyhow!("`{line}` {how}: {stderr_tail}"))
    }
}

/// Last `max` bytes of `text`, cut on a char boundary.
fn tail_of(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
