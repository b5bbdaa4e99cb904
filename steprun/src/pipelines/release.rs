//! Release preparation pipeline: install the Hermes compiler and sources, then
//! generate the Android artifacts.
//!
//! The Hermes tag and the release version are prerequisites. Both are read
//! before any step exists, so a missing marker never leaves a half-prepared
//! tree behind.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::info;

use crate::core::step::Step;
use crate::error::RunError;
use crate::io::command::{CommandAction, ExecOptions};
use crate::io::fetch::DownloadAction;
use crate::io::files::{CopyDir, InstallExtracted, RemoveDir, read_marker};
use crate::io::manifest::read_version;

use super::Pipeline;

pub const DEFAULT_ARCHIVE_BASE_URL: &str = "https://github.com/facebook/hermes/archive/refs/tags";
pub const DEFAULT_ARTIFACTS_COMMAND: &str = "./gradlew publishAllToMavenTempLocal";

const HERMES_INSTALL_LOCATION: &str = "packages/react-native/sdks";
const CORE_SDKS: &str = "node_modules/react-native-core/sdks";
const RELEASE_MANIFEST: &str = "packages/react-native/package.json";

/// Inputs for [`release_pipeline`].
#[derive(Debug, Clone)]
pub struct ReleaseOptions {
    pub root: PathBuf,
    /// Base URL; the archive is fetched from `<base>/<tag>.tar.gz`.
    pub archive_base_url: String,
    /// Shell command that generates the Android artifacts. Receives the release
    /// version in `RELEASE_VERSION`.
    pub artifacts_command: String,
    pub exec: ExecOptions,
}

impl Default for ReleaseOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            archive_base_url: DEFAULT_ARCHIVE_BASE_URL.to_string(),
            artifacts_command: DEFAULT_ARTIFACTS_COMMAND.to_string(),
            exec: ExecOptions::default(),
        }
    }
}

/// Prerequisites resolved before the release steps are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInputs {
    pub hermes_tag: String,
    pub version: String,
}

pub fn read_inputs(root: &Path) -> Result<ReleaseInputs, RunError> {
    let marker = root.join(CORE_SDKS).join(".hermesversion");
    let hermes_tag = read_marker(&marker)
        .map_err(|err| RunError::prerequisite("current Hermes release tag", err))?;
    let version = read_version(&root.join(RELEASE_MANIFEST))
        .map_err(|err| RunError::prerequisite("release version", err))?;
    Ok(ReleaseInputs {
        hermes_tag,
        version,
    })
}

pub fn release_pipeline(opts: &ReleaseOptions) -> Result<Pipeline, RunError> {
    let inputs = read_inputs(&opts.root)?;
    info!(tag = %inputs.hermes_tag, version = %inputs.version, "release inputs resolved");

    let download_dir = scratch_dir("hermes-tarball")?;
    let extract_dir = scratch_dir("hermes")?;
    let archive = download_dir.path().join("hermes.tar.gz");

    let install_root = opts.root.join(HERMES_INSTALL_LOCATION);
    let source_dest = install_root.join("hermes");
    let url = format!(
        "{}/{}.tar.gz",
        opts.archive_base_url.trim_end_matches('/'),
        inputs.hermes_tag
    );

    let steps = vec![
        Step::new(
            "Copy hermesc from core release",
            CopyDir {
                from: opts.root.join(CORE_SDKS).join("hermesc"),
                to: install_root.join("hermesc"),
            },
        ),
        Step::new(
            "Clean up previous Hermes installation",
            RemoveDir {
                path: source_dest.clone(),
            },
        )
        .with_failure_hint("Failed to clean up previous Hermes installation."),
        Step::new(
            format!("Download Hermes from {url}"),
            DownloadAction::new(&url, &archive),
        ),
        Step::new(
            "Extract Hermes",
            CommandAction::new(
                "tar",
                [
                    "-xzf".to_string(),
                    archive.display().to_string(),
                    "-C".to_string(),
                    extract_dir.path().display().to_string(),
                ],
            )
            .current_dir(&opts.root)
            .with_options(opts.exec),
        )
        .with_failure_hint("Failed to include Hermes in release."),
        Step::new(
            "Install Hermes sources",
            InstallExtracted {
                extracted: extract_dir.path().to_path_buf(),
                dest: source_dest.clone(),
            },
        )
        .with_failure_hint("Failed to include Hermes in release."),
        Step::new(
            "Clean up extra hermes directory",
            RemoveDir {
                path: source_dest.join(format!("hermes-{}", inputs.hermes_tag)),
            },
        ),
        Step::new(
            "Generate Android artifacts",
            CommandAction::shell(&opts.artifacts_command)
                .current_dir(&opts.root)
                .env("RELEASE_VERSION", &inputs.version)
                .with_options(opts.exec),
        )
        .with_failure_hint("Failed to generate Android artifacts."),
    ];

    Ok(Pipeline::new(steps)
        .with_title(format!("Preparing release {}", inputs.version))
        .with_success_message(format!("Release prepared for version {}", inputs.version))
        .holding(download_dir)
        .holding(extract_dir))
}

fn scratch_dir(prefix: &str) -> Result<TempDir, RunError> {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .map_err(|err| RunError::prerequisite(format!("{prefix} scratch directory"), err.into()))
}
