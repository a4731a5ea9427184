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

//! File-backed settings for the transfer manager.
//!
//! Layout: `model.rs` (typed settings), `validate.rs` (lenient field parsing),
//! `loader.rs` (`SettingsFile`: load, repair, persist), `defaults.rs`.

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::SettingsFile;
pub use model::{
    DownloadsSettings, LogFormat, LoggingSettings, SessionSettings, Settings, SpeedSettings,
};
