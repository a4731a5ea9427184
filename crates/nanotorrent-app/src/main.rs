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

//! Binary entrypoint for the nanotorrent command-line front end.

use nanotorrent_app::AppResult;

/// Runs one command and exits.
#[tokio::main]
async fn main() -> AppResult<()> {
    nanotorrent_app::run().await
}
