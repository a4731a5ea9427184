//! Default values written to a fresh settings file.

/// Settings file used when none is given.
pub const SETTINGS_FILE: &str = "settings.toml";
/// Metadata file used when none is configured.
pub const METADATA_FILE: &str = "torrent_metadata.json";
/// Log file used when none is configured.
pub const LOG_FILE: &str = "nanotorrent.log";
/// First listen port.
pub const LISTEN_PORT_START: u16 = 6881;
/// Last listen port.
pub const LISTEN_PORT_END: u16 = 6891;
/// Poll interval in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 1_000;
/// Log level directive.
pub const LOG_LEVEL: &str = "info";
