//! Filesystem step actions: copy, remove, create and relocate directories.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info};

use crate::core::step::Action;

/// Recursively copy `from` into `to`, overwriting files that already exist.
#[derive(Debug, Clone)]
pub struct CopyDir {
    pub from: PathBuf,
    pub to: PathBuf,
}

impl Action for CopyDir {
    fn run(&self) -> Result<()> {
        let copied = copy_dir_recursive(&self.from, &self.to)?;
        info!(from = %self.from.display(), to = %self.to.display(), copied, "copied directory");
        Ok(())
    }
}

/// Remove a directory tree. A directory that is already gone is success.
#[derive(Debug, Clone)]
pub struct RemoveDir {
    pub path: PathBuf,
}

impl Action for RemoveDir {
    fn run(&self) -> Result<()> {
        remove_dir_if_exists(&self.path)
    }
}

/// Create a directory and any missing parents.
#[derive(Debug, Clone)]
pub struct MakeDir {
    pub path: PathBuf,
}

impl Action for MakeDir {
    fn run(&self) -> Result<()> {
        fs::create_dir_all(&self.path)
            .with_context(|| format!("create directory {}", self.path.display()))
    }
}

/// Move the single top-level directory found in `extracted` to `dest`.
///
/// Archives extract to one versioned directory (`name-<tag>/`); this installs
/// it under a stable path. `dest` must not exist yet.
#[derive(Debug, Clone)]
pub struct InstallExtracted {
    pub extracted: PathBuf,
    pub dest: PathBuf,
}

impl Action for InstallExtracted {
    fn run(&self) -> Result<()> {
        let source = single_subdir(&self.extracted)?;
        if self.dest.exists() {
            bail!("install destination {} already exists", self.dest.display());
        }
        if let Some(parent) = self.dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        move_dir(&source, &self.dest)?;
        info!(from = %source.display(), to = %self.dest.display(), "installed extracted directory");
        Ok(())
    }
}

pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        debug!(path = %path.display(), "nothing to remove");
        return Ok(());
    }
    fs::remove_dir_all(path).with_context(|| format!("remove {}", path.display()))?;
    info!(path = %path.display(), "removed directory");
    Ok(())
}

/// Copy every file under `from` into `to`, returning the number of entries copied.
///
/// Symlinks are recreated as links rather than followed.
pub fn copy_dir_recursive(from: &Path, to: &Path) -> Result<usize> {
    if !from.is_dir() {
        bail!("copy source {} is not a directory", from.display());
    }
    fs::create_dir_all(to).with_context(|| format!("create directory {}", to.display()))?;
    let mut copied = 0;
    for entry in fs::read_dir(from).with_context(|| format!("read {}", from.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", from.display()))?;
        let file_type = entry.file_type().context("read file type")?;
        let target = to.join(entry.file_name());
        if file_type.is_symlink() {
            copy_symlink(&entry.path(), &target)?;
            copied += 1;
        } else if file_type.is_dir() {
            copied += copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!("copy {} to {}", entry.path().display(), target.display())
            })?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    let points_to =
        fs::read_link(link).with_context(|| format!("read link {}", link.display()))?;
    if let Ok(existing) = fs::symlink_metadata(target)
        && !existing.is_dir()
    {
        fs::remove_file(target).with_context(|| format!("remove {}", target.display()))?;
    }
    std::os::unix::fs::symlink(&points_to, target)
        .with_context(|| format!("link {} -> {}", target.display(), points_to.display()))
}

/// Read a marker file (e.g. a version tag) and return its trimmed contents.
pub fn read_marker(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value = raw.trim();
    if value.is_empty() {
        bail!("{} is empty", path.display());
    }
    Ok(value.to_string())
}

fn single_subdir(dir: &Path) -> Result<PathBuf> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        if entry.file_type().context("read file type")?.is_dir() {
            dirs.push(entry.path());
        }
    }
    match dirs.len() {
        1 => Ok(dirs.remove(0)),
        0 => Err(anyhow!("no directory found in {}", dir.display())),
        n => Err(anyhow!(
            "expected one directory in {}, found {n}",
            dir.display()
        )),
    }
}

fn move_dir(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) => {
            // rename fails across filesystems (temp dir vs. workspace)
            debug!(
                from = %from.display(),
                to = %to.display(),
                err = %err,
                "rename failed, copying instead"
            );
            move_by_copy(from, to)
        }
    }
}

fn move_by_copy(from: &Path, to: &Path) -> Result<()> {
    copy_dir_recursive(from, to)?;
    fs::remove_dir_all(from).with_context(|| format!("remove {}", from.display()))
}
