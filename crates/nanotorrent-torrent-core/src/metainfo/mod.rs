//! Transfer descriptor (`.torrent` metainfo) parsing.
//!
//! # Design
//! - Keep the raw bytes alongside the parsed view so a descriptor can be
//!   snapshotted verbatim to disk.
//! - Reject relative path components that could escape the save path.
//! - The content hash is the SHA-1 of the bencoded `info` dictionary as it
//!   appears in the input, not a re-encoding.

mod bencode;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::{TorrentError, TorrentResult};
use bencode::Value;

/// One file listed by a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorFile {
    /// `/`-separated path relative to the save path, including the
    /// descriptor's root name for multi-file layouts.
    pub path: String,
    /// File length in bytes.
    pub length: u64,
}

impl DescriptorFile {
    /// Path relative to a save or staging root.
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        self.path.split('/').collect()
    }
}

/// Parsed, immutable transfer descriptor.
#[derive(Debug, Clone)]
pub struct TransferDescriptor {
    bytes: Arc<[u8]>,
    name: String,
    files: Vec<DescriptorFile>,
    piece_length: u64,
    info_hash: String,
}

impl TransferDescriptor {
    /// Parse bencoded descriptor bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::InvalidDescriptor`] when the bytes are not a
    /// well-formed single- or multi-file descriptor.
    pub fn parse(bytes: impl Into<Vec<u8>>) -> TorrentResult<Self> {
        let bytes: Vec<u8> = bytes.into();
        if bytes.first() != Some(&b'd') {
            return Err(TorrentError::descriptor("root must be a dictionary"));
        }
        let (root, end) = bencode::parse_value(&bytes, 0)?;
        if end != bytes.len() {
            return Err(TorrentError::descriptor_at("trailing data", end));
        }
        let info_span = locate_info(&bytes)?;
        let info = root
            .get(b"info")
            .ok_or_else(|| TorrentError::descriptor("missing info dictionary"))?;
        if !matches!(info, Value::Dict(_)) {
            return Err(TorrentError::descriptor("info must be a dictionary"));
        }

        let name = info
            .get(b"name")
            .and_then(Value::as_bytes)
            .map(|raw| String::from_utf8_lossy(raw).into_owned())
            .ok_or_else(|| TorrentError::descriptor("missing name"))?;
        validate_segment(&name)?;

        let piece_length = info
            .get(b"piece length")
            .and_then(Value::as_int)
            .and_then(|value| u64::try_from(value).ok())
            .filter(|value| *value > 0)
            .ok_or_else(|| TorrentError::descriptor("missing piece length"))?;

        let files = match (info.get(b"length"), info.get(b"files")) {
            (Some(length), None) => vec![DescriptorFile {
                path: name.clone(),
                length: parse_length(length)?,
            }],
            (None, Some(files)) => parse_files(&name, files)?,
            (Some(_), Some(_)) => {
                return Err(TorrentError::descriptor("both length and files present"));
            }
            (None, None) => return Err(TorrentError::descriptor("missing length or files")),
        };

        let mut hasher = Sha1::new();
        hasher.update(&bytes[info_span.0..info_span.1]);
        let info_hash = hex::encode(hasher.finalize());

        Ok(Self {
            bytes: bytes.into(),
            name,
            files,
            piece_length,
            info_hash,
        })
    }

    /// Read and parse a descriptor file.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::Io`] when the file cannot be read, or
    /// [`TorrentError::InvalidDescriptor`] when its contents are malformed.
    pub fn read(path: &Path) -> TorrentResult<Self> {
        let bytes =
            fs::read(path).map_err(|source| TorrentError::io("read_descriptor", path, source))?;
        Self::parse(bytes)
    }

    /// Raw bencoded bytes, as supplied.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Display name (the `info.name` field).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Files in descriptor order.
    #[must_use]
    pub fn files(&self) -> &[DescriptorFile] {
        &self.files
    }

    /// Piece length in bytes.
    #[must_use]
    pub const fn piece_length(&self) -> u64 {
        self.piece_length
    }

    /// Sum of all file lengths.
    #[must_use]
    pub fn total_length(&self) -> u64 {
        self.files.iter().map(|file| file.length).sum()
    }

    /// Hex-encoded SHA-1 of the `info` dictionary.
    #[must_use]
    pub fn info_hash(&self) -> &str {
        &self.info_hash
    }
}

fn locate_info(bytes: &[u8]) -> TorrentResult<(usize, usize)> {
    let mut cursor = 1;
    while bytes.get(cursor).is_some_and(|byte| *byte != b'e') {
        let (key, value_start) = bencode::parse_value(bytes, cursor)?;
        let (_, value_end) = bencode::parse_value(bytes, value_start)?;
        if key.as_bytes() == Some(&b"info"[..]) {
            return Ok((value_start, value_end));
        }
        cursor = value_end;
    }
    Err(TorrentError::descriptor("missing info dictionary"))
}

fn parse_length(value: &Value) -> TorrentResult<u64> {
    value
        .as_int()
        .and_then(|length| u64::try_from(length).ok())
        .ok_or_else(|| TorrentError::descriptor("invalid file length"))
}

fn parse_files(root: &str, value: &Value) -> TorrentResult<Vec<DescriptorFile>> {
    let entries = value
        .as_list()
        .filter(|entries| !entries.is_empty())
        .ok_or_else(|| TorrentError::descriptor("files must be a non-empty list"))?;
    entries
        .iter()
        .map(|entry| {
            let length = entry
                .get(b"length")
                .ok_or_else(|| TorrentError::descriptor("file entry missing length"))
                .and_then(parse_length)?;
            let segments = entry
                .get(b"path")
                .and_then(Value::as_list)
                .filter(|segments| !segments.is_empty())
                .ok_or_else(|| TorrentError::descriptor("file entry missing path"))?;
            let mut path = String::from(root);
            for segment in segments {
                let segment = segment
                    .as_bytes()
                    .map(|raw| String::from_utf8_lossy(raw).into_owned())
                    .ok_or_else(|| TorrentError::descriptor("path segment must be a string"))?;
                validate_segment(&segment)?;
                path.push('/');
                path.push_str(&segment);
            }
            Ok(DescriptorFile { path, length })
        })
        .collect()
}

fn validate_segment(segment: &str) -> TorrentResult<()> {
    let unsafe_segment = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if unsafe_segment {
        return Err(TorrentError::descriptor("unsafe path component"));
    }
    Ok(())
}
