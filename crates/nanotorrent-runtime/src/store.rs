//! JSON-backed metadata store.
//!
//! # Design
//! - Reads never fail: a missing or unreadable file yields no records, and a
//!   malformed record is skipped without dropping its neighbours.
//! - Writes go to `<file>.tmp`, are synced, then renamed over the live file,
//!   so a failed save leaves the previous document intact.
//! - Descriptor copies are written next to the data, before the record set,
//!   through the same temp-and-rename path; unchanged copies are left alone.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use nanotorrent_torrent_core::TransferDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{RuntimeError, RuntimeResult};

/// File extension used for saved descriptor copies.
pub const DESCRIPTOR_EXTENSION: &str = "torrent";

/// One persisted transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Transfer identifier; files written before ids were stored get a fresh one.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Saved descriptor copy.
    pub torrent_file: PathBuf,
    /// Final save path.
    pub save_path: PathBuf,
    /// Last observed progress in `0.0..=1.0`.
    pub progress: f64,
    /// Display name.
    pub name: String,
    /// Whether the files were already moved out of staging.
    #[serde(default)]
    pub finalized: bool,
}

/// Live transfer state handed to [`MetadataStore::save`].
#[derive(Debug, Clone)]
pub struct RecordSnapshot {
    /// Transfer identifier.
    pub id: Uuid,
    /// Descriptor to snapshot next to the data.
    pub descriptor: TransferDescriptor,
    /// Final save path.
    pub save_path: PathBuf,
    /// Progress at snapshot time.
    pub progress: f64,
    /// Finalize flag at snapshot time.
    pub finalized: bool,
}

#[derive(Debug, Default, Serialize)]
struct MetadataDocument {
    torrents: Vec<MetadataRecord>,
}

/// On-disk shape before each record is validated on its own.
#[derive(Debug, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    torrents: Vec<Value>,
}

/// Reads and writes the metadata file.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    /// Store backed by the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Metadata file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the descriptor copy for `name` lives under `save_path`.
    #[must_use]
    pub fn descriptor_path(save_path: &Path, name: &str) -> PathBuf {
        let sanitized: String = name
            .chars()
            .map(|ch| if matches!(ch, '/' | '\\' | '\0') { '_' } else { ch })
            .collect();
        save_path.join(format!("{sanitized}.{DESCRIPTOR_EXTENSION}"))
    }

    /// Load every record, degrading to an empty list on any failure.
    #[must_use]
    pub fn load(&self) -> Vec<MetadataRecord> {
        match self.try_load() {
            Ok(Some(records)) => {
                info!(
                    path = %self.path.display(),
                    records = records.len(),
                    "metadata loaded"
                );
                records
            }
            Ok(None) => {
                info!(path = %self.path.display(), "no metadata file found");
                Vec::new()
            }
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "failed to load metadata");
                Vec::new()
            }
        }
    }

    fn try_load(&self) -> RuntimeResult<Option<Vec<MetadataRecord>>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(RuntimeError::io("load_metadata", &self.path, err)),
        };
        let document: RawDocument = serde_json::from_slice(&raw)
            .map_err(|err| RuntimeError::json("decode_metadata", &self.path, err))?;
        let records = document
            .torrents
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value::<MetadataRecord>(value) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(
                        path = %self.path.display(),
                        index,
                        error = %err,
                        "skipping malformed metadata record"
                    );
                    None
                }
            })
            .map(|mut record| {
                record.progress = if record.progress.is_finite() {
                    record.progress.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                record
            })
            .collect();
        Ok(Some(records))
    }

    /// Snapshot descriptors and atomically replace the metadata file.
    ///
    /// Returns the number of records written.
    ///
    /// # Errors
    ///
    /// Returns an error when the document cannot be encoded, written, synced
    /// or renamed into place. Descriptor copy failures are logged only.
    pub fn save(&self, snapshots: &[RecordSnapshot]) -> RuntimeResult<usize> {
        let mut torrents = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            let name = snapshot.descriptor.name();
            let torrent_file = Self::descriptor_path(&snapshot.save_path, name);
            if let Err(err) = write_descriptor(&torrent_file, snapshot.descriptor.bytes()) {
                warn!(
                    transfer = name,
                    path = %torrent_file.display(),
                    error = %err,
                    "failed to snapshot descriptor"
                );
            }
            torrents.push(MetadataRecord {
                id: snapshot.id,
                torrent_file,
                save_path: snapshot.save_path.clone(),
                progress: snapshot.progress,
                name: name.to_string(),
                finalized: snapshot.finalized,
            });
        }

        let document = MetadataDocument { torrents };
        let encoded = serde_json::to_vec_pretty(&document)
            .map_err(|err| RuntimeError::json("encode_metadata", &self.path, err))?;
        replace_file(&self.path, &encoded)?;
        info!(
            path = %self.path.display(),
            records = document.torrents.len(),
            "metadata saved"
        );
        Ok(document.torrents.len())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("metadata"), OsString::from);
    name.push(".tmp");
    path.with_file_name(name)
}

fn replace_file(path: &Path, contents: &[u8]) -> RuntimeResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|err| RuntimeError::io("create_parent_dir", parent, err))?;
    }
    let temp = temp_path_for(path);
    let result = write_then_rename(&temp, path, contents);
    if result.is_err() {
        if let Err(err) = fs::remove_file(&temp) {
            debug!(path = %temp.display(), error = %err, "temporary file not removed");
        }
    }
    result
}

fn write_then_rename(temp: &Path, target: &Path, contents: &[u8]) -> RuntimeResult<()> {
    let mut file = File::create(temp).map_err(|err| RuntimeError::io("create_temp", temp, err))?;
    file.write_all(contents)
        .map_err(|err| RuntimeError::io("write_temp", temp, err))?;
    file.sync_all()
        .map_err(|err| RuntimeError::io("sync_temp", temp, err))?;
    drop(file);
    fs::rename(temp, target).map_err(|err| RuntimeError::io("rename_metadata", target, err))
}

fn write_descriptor(path: &Path, bytes: &[u8]) -> RuntimeResult<()> {
    match fs::read(path) {
        Ok(existing) if existing == bytes => return Ok(()),
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(RuntimeError::io("read_descriptor_copy", path, err)),
    }
    replace_file(path, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanotorrent_test_support::fixtures::{DescriptorBuilder, temp_dir};

    #[test]
    fn descriptor_path_sanitizes_separators() {
        let path = MetadataStore::descriptor_path(Path::new("/data"), "a/b\\c");
        assert_eq!(path, PathBuf::from("/data/a_b_c.torrent"));
    }

    #[test]
    fn temp_path_sits_next_to_file() {
        let store = MetadataStore::new("/state/torrent_metadata.json");
        assert_eq!(
            temp_path_for(&store.path),
            PathBuf::from("/state/torrent_metadata.json.tmp")
        );
    }

    #[test]
    fn missing_file_loads_empty() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let store = MetadataStore::new(temp.path().join("absent.json"));
        assert!(store.load().is_empty());
        Ok(())
    }

    #[test]
    fn corrupt_file_loads_empty() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let path = temp.path().join("meta.json");
        fs::write(&path, b"{ not json")?;
        assert!(MetadataStore::new(&path).load().is_empty());
        Ok(())
    }

    #[test]
    fn records_without_finalized_flag_still_load() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let path = temp.path().join("meta.json");
        fs::write(
            &path,
            br#"{"torrents":[{"torrent_file":"/d/A.torrent","save_path":"/d","progress":1.7,"name":"A"}]}"#,
        )?;
        let records = MetadataStore::new(&path).load();
        assert_eq!(records.len(), 1);
        assert!(!records[0].finalized);
        assert!((records[0].progress - 1.0).abs() < f64::EPSILON);
        Ok(())
    }

    #[test]
    fn save_writes_descriptor_copy_and_document() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let bytes = DescriptorBuilder::new("A").file(&["x"], 4).build();
        let descriptor = TransferDescriptor::parse(bytes.clone())?;
        let save_path = temp.path().join("data");
        let store = MetadataStore::new(temp.path().join("meta.json"));

        let id = Uuid::new_v4();
        let written = store.save(&[RecordSnapshot {
            id,
            descriptor,
            save_path: save_path.clone(),
            progress: 0.5,
            finalized: false,
        }])?;
        assert_eq!(written, 1);
        assert_eq!(fs::read(save_path.join("A.torrent"))?, bytes);
        assert!(!temp_path_for(&store.path).exists());

        let text = fs::read_to_string(store.path())?;
        assert!(text.contains("\"torrents\""));
        let records = store.load();
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].name, "A");
        assert_eq!(records[0].torrent_file, save_path.join("A.torrent"));
        assert!(!save_path.join("A.torrent.tmp").exists());
        Ok(())
    }

    #[test]
    fn malformed_record_is_skipped_and_neighbours_load() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let path = temp.path().join("meta.json");
        fs::write(
            &path,
            br#"{"torrents":[
                {"torrent_file":"/d/A.torrent","save_path":"/d","progress":0.1,"name":"A"},
                {"torrent_file":"/d/B.torrent","save_path":"/d","progress":"half"},
                {"torrent_file":"/d/C.torrent","save_path":"/d","progress":0.3,"name":"C"}
            ]}"#,
        )?;
        let names: Vec<_> = MetadataStore::new(&path)
            .load()
            .into_iter()
            .map(|record| record.name)
            .collect();
        assert_eq!(names, vec!["A", "C"]);
        Ok(())
    }

    #[test]
    fn descriptor_copy_is_replaced_atomically_and_only_when_changed() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let path = temp.path().join("data/A.torrent");
        write_descriptor(&path, b"first")?;
        assert_eq!(fs::read(&path)?, b"first");
        let before = fs::metadata(&path)?.modified()?;

        write_descriptor(&path, b"first")?;
        assert_eq!(fs::metadata(&path)?.modified()?, before);

        write_descriptor(&path, b"second")?;
        assert_eq!(fs::read(&path)?, b"second");
        assert!(!temp.path().join("data/A.torrent.tmp").exists());
        Ok(())
    }

    #[test]
    fn blocked_descriptor_copy_keeps_previous_bytes() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let path = temp.path().join("A.torrent");
        fs::write(&path, b"intact")?;
        fs::create_dir_all(temp.path().join("A.torrent.tmp"))?;
        assert!(write_descriptor(&path, b"replacement").is_err());
        assert_eq!(fs::read(&path)?, b"intact");
        Ok(())
    }
}
