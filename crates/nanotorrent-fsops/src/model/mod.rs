//! Request and report types for staging operations.

use std::path::PathBuf;

use crate::error::FsOpsError;

/// Files of one completed transfer to relocate out of staging.
#[derive(Debug, Clone)]
pub struct FinalizeRequest {
    /// Transfer display name, used for log context.
    pub name: String,
    /// Final save path; staging is derived from it.
    pub save_path: PathBuf,
    /// File paths relative to the save path, in descriptor order.
    pub files: Vec<PathBuf>,
}

/// One file that could not be finalized.
#[derive(Debug)]
pub struct FileFailure {
    /// File path relative to the save path.
    pub relative: PathBuf,
    /// What went wrong.
    pub error: FsOpsError,
}

/// Outcome of a finalize batch.
#[derive(Debug, Default)]
pub struct FinalizeReport {
    /// Files moved from staging to their destination.
    pub moved: usize,
    /// Files already at their destination with nothing staged.
    pub already_present: usize,
    /// Files left unfinalized.
    pub failures: Vec<FileFailure>,
}

impl FinalizeReport {
    /// Number of files that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Whether every file ended at its destination.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Where a transfer's files currently sit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StagingLayout {
    /// Files present under the staging path.
    pub in_staging: usize,
    /// Files present only at their final path.
    pub in_final: usize,
    /// Files found in neither place.
    pub missing: usize,
}

impl StagingLayout {
    /// Every file is at its final path.
    #[must_use]
    pub const fn is_fully_final(&self) -> bool {
        self.in_final > 0 && self.in_staging == 0 && self.missing == 0
    }

    /// Some files reached their final path while others remain staged,
    /// which is what an interrupted finalize leaves behind.
    #[must_use]
    pub const fn is_partially_final(&self) -> bool {
        self.in_final > 0 && self.in_staging > 0
    }
}
