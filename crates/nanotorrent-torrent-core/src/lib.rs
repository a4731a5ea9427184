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

//! Engine-agnostic transfer interfaces, descriptor parsing, and DTOs.
//!
//! Layout: `model/` (handles, states, status snapshots), `metainfo/` (descriptor
//! parsing), `service/` (the `TransferEngine` facade trait), `error.rs`.

pub mod error;
pub mod metainfo;
pub mod model;
pub mod service;

pub use error::{TorrentError, TorrentResult};
pub use metainfo::{DescriptorFile, TransferDescriptor};
pub use model::{
    DescriptorSource, EngineStatus, LifecycleState, RateLimits, TransferHandle, TransferStatus,
};
pub use service::TransferEngine;
