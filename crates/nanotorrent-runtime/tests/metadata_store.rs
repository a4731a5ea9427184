use std::fs;

use nanotorrent_runtime::{MetadataStore, RecordSnapshot, RuntimeError};
use nanotorrent_test_support::fixtures::{DescriptorBuilder, temp_dir};
use nanotorrent_torrent_core::TransferDescriptor;
use uuid::Uuid;

fn snapshot(name: &str, save: &std::path::Path, progress: f64) -> anyhow::Result<RecordSnapshot> {
    Ok(RecordSnapshot {
        id: Uuid::new_v4(),
        descriptor: TransferDescriptor::parse(DescriptorBuilder::new(name).file(&[], 8).build())?,
        save_path: save.to_path_buf(),
        progress,
        finalized: false,
    })
}

#[test]
fn save_then_load_round_trips_names_and_paths() -> anyhow::Result<()> {
    let temp = temp_dir()?;
    let store = MetadataStore::new(temp.path().join("state/torrent_metadata.json"));
    let first = temp.path().join("one");
    let second = temp.path().join("two");

    let a = snapshot("A", &first, 0.25)?;
    let b = snapshot("B", &second, 1.0)?;
    let ids = [a.id, b.id];
    let count = store.save(&[a, b])?;
    assert_eq!(count, 2);

    let records = store.load();
    let pairs: Vec<(&str, &std::path::Path)> = records
        .iter()
        .map(|record| (record.name.as_str(), record.save_path.as_path()))
        .collect();
    assert_eq!(pairs, vec![("A", first.as_path()), ("B", second.as_path())]);
    assert_eq!([records[0].id, records[1].id], ids);
    assert!((records[0].progress - 0.25).abs() < f64::EPSILON);
    assert!(TransferDescriptor::read(&records[1].torrent_file).is_ok());
    Ok(())
}

#[test]
fn failed_save_keeps_previous_document() -> anyhow::Result<()> {
    let temp = temp_dir()?;
    let path = temp.path().join("meta.json");
    let store = MetadataStore::new(&path);
    store.save(&[snapshot("kept", temp.path(), 0.5)?])?;

    fs::create_dir_all(temp.path().join("meta.json.tmp"))?;
    let result = store.save(&[snapshot("lost", temp.path(), 0.0)?]);
    assert!(matches!(result, Err(RuntimeError::Io { .. })));

    let records = store.load();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "kept");
    Ok(())
}

#[test]
fn empty_registry_writes_empty_document() -> anyhow::Result<()> {
    let temp = temp_dir()?;
    let store = MetadataStore::new(temp.path().join("meta.json"));
    assert_eq!(store.save(&[])?, 0);
    let value: serde_json::Value = serde_json::from_slice(&fs::read(store.path())?)?;
    assert_eq!(value["torrents"].as_array().map(Vec::len), Some(0));
    Ok(())
}
