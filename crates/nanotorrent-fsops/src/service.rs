//! Staging preparation, inspection and finalize moves.
//!
//! # Design
//! - A file is moved with `rename` first; when that fails (for example across
//!   devices) it is copied and the staged copy removed.
//! - A staged file always wins over an existing destination.
//! - Finalize never aborts the batch on one file; failures are reported.
//! - Only directories emptied by a finalize are pruned, never `.incomplete` itself.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{FsOpsError, FsOpsResult};
use crate::model::{FileFailure, FinalizeReport, FinalizeRequest, StagingLayout};

/// Name of the staging directory created under each save path.
pub const STAGING_DIR_NAME: &str = ".incomplete";

/// Default staging directory for a save path.
#[must_use]
pub fn staging_path(save_path: &Path) -> PathBuf {
    save_path.join(STAGING_DIR_NAME)
}

enum Outcome {
    Moved,
    AlreadyPresent,
}

/// Manages the staging area under each save path.
#[derive(Debug, Clone, Copy)]
pub struct StagingManager {
    dir_name: &'static str,
}

impl Default for StagingManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StagingManager {
    /// Construct a staging manager using [`STAGING_DIR_NAME`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dir_name: STAGING_DIR_NAME,
        }
    }

    /// Staging directory this manager uses for a save path.
    #[must_use]
    pub fn staging_path(&self, save_path: &Path) -> PathBuf {
        save_path.join(self.dir_name)
    }

    /// Ensure the staging directory exists and return it.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::InvalidInput`] for an empty save path and
    /// [`FsOpsError::Io`] when the directory cannot be created.
    pub fn prepare_staging(&self, save_path: &Path) -> FsOpsResult<PathBuf> {
        if save_path.as_os_str().is_empty() {
            return Err(FsOpsError::InvalidInput {
                field: "save_path",
                reason: "empty",
                value: None,
            });
        }
        let staging = self.staging_path(save_path);
        fs::create_dir_all(&staging)
            .map_err(|source| FsOpsError::io("prepare_staging", &staging, source))?;
        debug!(staging = %staging.display(), "staging directory ready");
        Ok(staging)
    }

    /// Move every staged file of a completed transfer to its final path.
    ///
    /// Safe to call again after a partial run: files already moved are
    /// counted as already present.
    #[must_use]
    pub fn finalize(&self, request: &FinalizeRequest) -> FinalizeReport {
        let staging = self.staging_path(&request.save_path);
        let mut report = FinalizeReport::default();

        for relative in &request.files {
            match finalize_file(&staging, &request.save_path, relative) {
                Ok(Outcome::Moved) => report.moved += 1,
                Ok(Outcome::AlreadyPresent) => report.already_present += 1,
                Err(error) => {
                    warn!(
                        transfer = %request.name,
                        file = %relative.display(),
                        error = %error,
                        "failed to finalize file"
                    );
                    report.failures.push(FileFailure {
                        relative: relative.clone(),
                        error,
                    });
                }
            }
        }

        for root in top_level_dirs(&request.files) {
            if let Err(err) = prune_empty_dirs(&staging.join(root)) {
                debug!(
                    transfer = %request.name,
                    error = %err,
                    "staging prune skipped"
                );
            }
        }

        info!(
            transfer = %request.name,
            moved = report.moved,
            already_present = report.already_present,
            failed = report.failed(),
            "finalize complete"
        );
        report
    }

    /// Count where a transfer's files currently live.
    #[must_use]
    pub fn inspect(&self, save_path: &Path, files: &[PathBuf]) -> StagingLayout {
        let staging = self.staging_path(save_path);
        let mut layout = StagingLayout::default();
        for relative in files {
            if validate_relative(relative).is_err() {
                layout.missing += 1;
            } else if staging.join(relative).is_file() {
                layout.in_staging += 1;
            } else if save_path.join(relative).is_file() {
                layout.in_final += 1;
            } else {
                layout.missing += 1;
            }
        }
        layout
    }
}

fn finalize_file(staging: &Path, save_path: &Path, relative: &Path) -> FsOpsResult<Outcome> {
    validate_relative(relative)?;
    let source = staging.join(relative);
    let destination = save_path.join(relative);

    if !source.exists() {
        if destination.exists() {
            return Ok(Outcome::AlreadyPresent);
        }
        return Err(FsOpsError::MissingPayload {
            staged: source,
            destination,
        });
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| FsOpsError::io("finalize.create_parent", parent, err))?;
    }
    move_file(&source, &destination)?;
    Ok(Outcome::Moved)
}

fn move_file(source: &Path, destination: &Path) -> FsOpsResult<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!(
                source = %source.display(),
                error = %rename_err,
                "rename failed, copying instead"
            );
            fs::copy(source, destination)
                .map_err(|err| FsOpsError::io("finalize.copy_file", destination, err))?;
            match fs::remove_file(source) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(FsOpsError::io("finalize.remove_staged", source, err)),
            }
        }
    }
}

fn validate_relative(relative: &Path) -> FsOpsResult<()> {
    let safe = !relative.as_os_str().is_empty()
        && relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if safe {
        Ok(())
    } else {
        Err(FsOpsError::InvalidInput {
            field: "relative_path",
            reason: "must be a plain relative path",
            value: Some(relative.to_string_lossy().into_owned()),
        })
    }
}

fn top_level_dirs(files: &[PathBuf]) -> BTreeSet<PathBuf> {
    files
        .iter()
        .filter(|relative| relative.components().count() > 1)
        .filter_map(|relative| relative.components().next())
        .filter_map(|component| match component {
            Component::Normal(name) => Some(PathBuf::from(name)),
            _ => None,
        })
        .collect()
}

fn prune_empty_dirs(root: &Path) -> FsOpsResult<()> {
    if !root.is_dir() {
        return Ok(());
    }
    for entry in WalkDir::new(root).contents_first(true) {
        let entry = entry.map_err(|err| FsOpsError::walkdir("prune.walk", root, err))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        match fs::remove_dir(entry.path()) {
            Ok(()) => {}
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::DirectoryNotEmpty
                ) => {}
            Err(err) => return Err(FsOpsError::io("prune.remove_dir", entry.path(), err)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanotorrent_test_support::fixtures::{temp_dir, write_file};

    #[test]
    fn prepare_staging_rejects_empty_path() {
        let result = StagingManager::new().prepare_staging(Path::new(""));
        assert!(matches!(
            result,
            Err(FsOpsError::InvalidInput {
                field: "save_path",
                ..
            })
        ));
    }

    #[test]
    fn prepare_staging_creates_nested_directory() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let save = temp.path().join("deep/save");
        let staging = StagingManager::new().prepare_staging(&save)?;
        assert_eq!(staging, save.join(STAGING_DIR_NAME));
        assert!(staging.is_dir());
        Ok(())
    }

    #[test]
    fn relative_paths_must_stay_inside_roots() {
        assert!(validate_relative(Path::new("A/x")).is_ok());
        assert!(validate_relative(Path::new("../x")).is_err());
        assert!(validate_relative(Path::new("/abs")).is_err());
        assert!(validate_relative(Path::new("")).is_err());
    }

    #[test]
    fn staged_file_overwrites_existing_destination() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let save = temp.path();
        write_file(&staging_path(save).join("f.bin"), 5)?;
        fs::write(save.join("f.bin"), b"old")?;

        let report = StagingManager::new().finalize(&FinalizeRequest {
            name: "f.bin".into(),
            save_path: save.to_path_buf(),
            files: vec![PathBuf::from("f.bin")],
        });
        assert_eq!(report.moved, 1);
        assert_eq!(fs::metadata(save.join("f.bin"))?.len(), 5);
        Ok(())
    }

    #[test]
    fn prune_keeps_directories_with_remaining_files() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let root = temp.path().join("A");
        fs::create_dir_all(root.join("empty/nested"))?;
        write_file(&root.join("kept/file.bin"), 1)?;
        prune_empty_dirs(&root)?;
        assert!(!root.join("empty").exists());
        assert!(root.join("kept/file.bin").exists());
        Ok(())
    }
}
