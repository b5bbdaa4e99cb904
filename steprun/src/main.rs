//! Sequential fail-fast step runner CLI.
//!
//! Runs a pipeline file (`steprun.toml`) or one of the built-in pipelines,
//! printing a progress line per step and exiting non-zero on the first failure.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use steprun::core::types::RunResult;
use steprun::exit_codes;
use steprun::io::command::{DEFAULT_OUTPUT_LIMIT_BYTES, ExecOptions};
use steprun::io::config::{
    DEFAULT_PIPELINE_FILE, load_pipeline, sample_pipeline, write_pipeline,
};
use steprun::io::console::ConsoleReporter;
use steprun::logging;
use steprun::pipelines::Pipeline;
use steprun::pipelines::ci::{
    CiOptions, DEFAULT_JEST_BINARY, DEFAULT_MAX_WORKERS, DEFAULT_YARN_BINARY, ci_pipeline,
};
use steprun::pipelines::custom;
use steprun::pipelines::release::{
    DEFAULT_ARCHIVE_BASE_URL, DEFAULT_ARTIFACTS_COMMAND, ReleaseOptions, release_pipeline,
};

#[derive(Parser)]
#[command(name = "steprun", version, about = "Sequential fail-fast step runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every step of a pipeline file in order, stopping at the first failure.
    Run {
        /// Pipeline file to run.
        #[arg(short, long, default_value = DEFAULT_PIPELINE_FILE)]
        file: PathBuf,
        /// Directory relative step paths resolve against.
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Print the step names of a pipeline file without running them.
    List {
        #[arg(short, long, default_value = DEFAULT_PIPELINE_FILE)]
        file: PathBuf,
    },
    /// Write a starter pipeline file.
    Init {
        #[arg(short, long, default_value = DEFAULT_PIPELINE_FILE)]
        file: PathBuf,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Run the JavaScript CI sequence (codegen check, lint, builds, Jest, TypeScript).
    Ci {
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// How many Jest workers to use.
        #[arg(long, default_value_t = DEFAULT_MAX_WORKERS)]
        max_workers: u32,
        /// Path to the Jest binary.
        #[arg(long, default_value = DEFAULT_JEST_BINARY)]
        jest_binary: String,
        /// Path to the yarn binary.
        #[arg(long, default_value = DEFAULT_YARN_BINARY)]
        yarn_binary: String,
        #[command(flatten)]
        exec: ExecArgs,
    },
    /// Prepare a release: install Hermes, then generate Android artifacts.
    Release {
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Base URL the `<tag>.tar.gz` source archive is fetched from.
        #[arg(long, default_value = DEFAULT_ARCHIVE_BASE_URL)]
        archive_base_url: String,
        /// Shell command that generates the Android artifacts.
        #[arg(long, default_value = DEFAULT_ARTIFACTS_COMMAND)]
        artifacts_command: String,
        #[command(flatten)]
        exec: ExecArgs,
    },
}

/// Sub-process supervision flags shared by the built-in pipelines.
#[derive(Args, Debug, Clone)]
struct ExecArgs {
    /// Kill any single command after this many seconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,
    /// Capture command output and quote stderr on failure instead of streaming it.
    #[arg(long)]
    capture_output: bool,
}

impl ExecArgs {
    fn options(&self) -> ExecOptions {
        ExecOptions {
            timeout: self.timeout_secs.map(Duration::from_secs),
            capture_output: self.capture_output,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::FAILED
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run { file, root } => {
            let pipeline = custom::load(&root, &file)?;
            Ok(execute(&pipeline))
        }
        Command::List { file } => {
            let pipeline = load_pipeline(&file)?;
            for step in &pipeline.steps {
                println!("{}", step.name);
            }
            Ok(exit_codes::OK)
        }
        Command::Init { file, force } => {
            if file.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", file.display());
            }
            write_pipeline(&file, &sample_pipeline())
                .with_context(|| format!("write {}", file.display()))?;
            println!("{}", file.display());
            Ok(exit_codes::OK)
        }
        Command::Ci {
            root,
            max_workers,
            jest_binary,
            yarn_binary,
            exec,
        } => {
            let pipeline = ci_pipeline(&CiOptions {
                root,
                max_workers,
                jest_binary,
                yarn_binary,
                exec: exec.options(),
            });
            Ok(execute(&pipeline))
        }
        Command::Release {
            root,
            archive_base_url,
            artifacts_command,
            exec,
        } => {
            let pipeline = release_pipeline(&ReleaseOptions {
                root,
                archive_base_url,
                artifacts_command,
                exec: exec.options(),
            })?;
            Ok(execute(&pipeline))
        }
    }
}

fn execute(pipeline: &Pipeline) -> i32 {
    let mut reporter = ConsoleReporter::stdout();
    let result = pipeline.run(&mut reporter);
    if let RunResult::Failure(failure) = &result {
        debug!(step = %failure.step_name, position = failure.position, "run failed");
    }
    result.exit_code()
}
