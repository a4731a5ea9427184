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

//! Persistence for the set of known transfers.
//!
//! Layout: `error.rs` (`RuntimeError`), `store.rs` (`MetadataStore` and the
//! on-disk record types).

pub mod error;
pub mod store;

pub use error::{RuntimeError, RuntimeResult};
pub use store::{DESCRIPTOR_EXTENSION, MetadataRecord, MetadataStore, RecordSnapshot};
