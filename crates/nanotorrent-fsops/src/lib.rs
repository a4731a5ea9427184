//! Staging area management for in-flight transfers.
#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Incomplete data lives under `<save_path>/.incomplete` and is moved into
//! `<save_path>` once the engine reports completion.

pub mod error;
pub mod model;
pub mod service;

pub use error::{FsOpsError, FsOpsResult};
pub use model::{FileFailure, FinalizeReport, FinalizeRequest, StagingLayout};
pub use service::{STAGING_DIR_NAME, StagingManager, staging_path};
