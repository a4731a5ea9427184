use std::fs;
use std::path::PathBuf;

use nanotorrent_fsops::{FinalizeRequest, FsOpsError, StagingLayout, StagingManager, staging_path};
use nanotorrent_test_support::fixtures::{DescriptorBuilder, temp_dir};

fn request_for(builder: &DescriptorBuilder, save: PathBuf) -> FinalizeRequest {
    FinalizeRequest {
        name: "A".into(),
        save_path: save,
        files: builder
            .relative_paths()
            .iter()
            .map(|path| path.split('/').collect())
            .collect(),
    }
}

#[test]
fn staged_tree_moves_to_save_path_and_prunes() -> anyhow::Result<()> {
    let temp = temp_dir()?;
    let save = temp.path().join("data");
    let manager = StagingManager::new();
    let staging = manager.prepare_staging(&save)?;

    let builder = DescriptorBuilder::new("A")
        .file(&["x"], 7)
        .file(&["sub", "y"], 3);
    builder.write_payload(&staging)?;

    let request = request_for(&builder, save.clone());
    let report = manager.finalize(&request);
    assert_eq!(report.moved, 2);
    assert!(report.is_clean());
    assert_eq!(fs::metadata(save.join("A/x"))?.len(), 7);
    assert_eq!(fs::metadata(save.join("A/sub/y"))?.len(), 3);
    assert!(!staging.join("A").exists());
    assert!(staging.is_dir());

    let again = manager.finalize(&request);
    assert_eq!(again.moved, 0);
    assert_eq!(again.already_present, 2);
    assert!(again.is_clean());
    Ok(())
}

#[test]
fn missing_file_is_reported_and_batch_continues() -> anyhow::Result<()> {
    let temp = temp_dir()?;
    let save = temp.path().to_path_buf();
    let manager = StagingManager::new();
    let staging = manager.prepare_staging(&save)?;

    let builder = DescriptorBuilder::new("A")
        .file(&["gone"], 1)
        .file(&["here"], 2);
    fs::create_dir_all(staging.join("A"))?;
    fs::write(staging.join("A/here"), b"ok")?;

    let report = manager.finalize(&request_for(&builder, save.clone()));
    assert_eq!(report.moved, 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].relative, PathBuf::from("A").join("gone"));
    assert!(matches!(
        report.failures[0].error,
        FsOpsError::MissingPayload { .. }
    ));
    assert!(save.join("A/here").is_file());
    Ok(())
}

#[test]
fn inspect_reports_interrupted_finalize() -> anyhow::Result<()> {
    let temp = temp_dir()?;
    let save = temp.path().to_path_buf();
    let builder = DescriptorBuilder::new("A")
        .file(&["one"], 1)
        .file(&["two"], 1)
        .file(&["three"], 1);
    let files: Vec<PathBuf> = builder
        .relative_paths()
        .iter()
        .map(|path| path.split('/').collect())
        .collect();
    let manager = StagingManager::new();

    assert_eq!(
        manager.inspect(&save, &files),
        StagingLayout {
            in_staging: 0,
            in_final: 0,
            missing: 3
        }
    );

    builder.write_payload(&staging_path(&save))?;
    fs::create_dir_all(save.join("A"))?;
    fs::rename(staging_path(&save).join("A/one"), save.join("A/one"))?;

    let layout = manager.inspect(&save, &files);
    assert_eq!(layout.in_staging, 2);
    assert_eq!(layout.in_final, 1);
    assert!(layout.is_partially_final());
    Ok(())
}
