//! Conversions between native engine codes and domain types.

use nanotorrent_torrent_core::LifecycleState;
use tracing::debug;

use crate::types::codes;

/// Map a native state code onto the lifecycle enum; unrecognised codes become `Unknown`.
#[must_use]
pub fn map_state(code: i32) -> LifecycleState {
    match code {
        codes::QUEUED_FOR_CHECKING => LifecycleState::Queued,
        codes::CHECKING_FILES | codes::CHECKING_RESUME_DATA => LifecycleState::Checking,
        codes::DOWNLOADING_METADATA => LifecycleState::FetchingMetadata,
        codes::DOWNLOADING => LifecycleState::Transferring,
        codes::FINISHED => LifecycleState::Finished,
        codes::SEEDING => LifecycleState::Seeding,
        codes::ALLOCATING => LifecycleState::Allocating,
        codes::ERROR => LifecycleState::Error,
        other => {
            debug!(code = other, "unknown native transfer state reported by engine");
            LifecycleState::Unknown
        }
    }
}
