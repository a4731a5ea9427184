//! Strongly typed session parameters and native state codes.

use nanotorrent_torrent_core::{RateLimits, TorrentError, TorrentResult};

/// Native transfer state codes, numbered like libtorrent's `torrent_status::state_t`.
pub mod codes {
    /// Waiting in the check queue.
    pub const QUEUED_FOR_CHECKING: i32 = 0;
    /// Hash-checking existing files.
    pub const CHECKING_FILES: i32 = 1;
    /// Fetching the info dictionary from peers.
    pub const DOWNLOADING_METADATA: i32 = 2;
    /// Downloading payload.
    pub const DOWNLOADING: i32 = 3;
    /// All wanted pieces present.
    pub const FINISHED: i32 = 4;
    /// Complete and uploading.
    pub const SEEDING: i32 = 5;
    /// Reserving storage.
    pub const ALLOCATING: i32 = 6;
    /// Validating fast-resume data.
    pub const CHECKING_RESUME_DATA: i32 = 7;
    /// Storage or session error.
    pub const ERROR: i32 = 8;
}

/// Inclusive TCP/UDP port range the session listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    /// First port tried.
    pub start: u16,
    /// Last port tried.
    pub end: u16,
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            start: 6881,
            end: 6891,
        }
    }
}

/// Runtime parameters applied when the session is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Listen port range.
    pub listen_ports: PortRange,
    /// Initial session-wide rate limits.
    pub rate_limits: RateLimits,
}

impl SessionConfig {
    pub(crate) const fn validate(&self) -> TorrentResult<()> {
        if self.listen_ports.start == 0 {
            return Err(TorrentError::InvalidSession {
                field: "listen_ports.start",
                reason: "port must be non-zero",
            });
        }
        if self.listen_ports.start > self.listen_ports.end {
            return Err(TorrentError::InvalidSession {
                field: "listen_ports",
                reason: "start must not exceed end",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SessionConfig::default();
        assert_eq!(config.listen_ports, PortRange { start: 6881, end: 6891 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn inverted_or_zero_ports_are_rejected() {
        let inverted = SessionConfig {
            listen_ports: PortRange {
                start: 7000,
                end: 6000,
            },
            ..SessionConfig::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(TorrentError::InvalidSession { field: "listen_ports", .. })
        ));
        let zero = SessionConfig {
            listen_ports: PortRange { start: 0, end: 10 },
            ..SessionConfig::default()
        };
        assert!(zero.validate().is_err());
    }
}
