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

//! nanotorrent application wiring.
//!
//! Layout: `orchestrator.rs` (`TransferManager`: add, list, remove, persist,
//! reload, poll, finalize), `bootstrap.rs` (settings, logging, engine
//! session), `cli.rs` (command-line front end), `error.rs`.

/// Startup wiring.
pub mod bootstrap;
/// Command-line front end.
pub mod cli;
/// Error types.
pub mod error;
/// Transfer lifecycle manager.
pub mod orchestrator;

pub use bootstrap::{AppContext, assemble, bootstrap};
pub use cli::run;
pub use error::{AppError, AppResult, LifecycleError, LifecycleResult};
pub use orchestrator::{ManagerConfig, PollReport, ReloadReport, TransferManager};
