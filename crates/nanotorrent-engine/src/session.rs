//! Local session state driven by what is present on disk.
//!
//! # Design
//! - Progress is the number of payload bytes found under a transfer's storage
//!   root, capped per file at the declared length.
//! - Completed transfers are never rescanned; their files may be moved away
//!   by the caller once they finish.
//! - All methods are synchronous and may block on the filesystem; callers run
//!   them on the blocking pool.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use nanotorrent_torrent_core::{
    DescriptorFile, EngineStatus, RateLimits, TorrentError, TorrentResult, TransferDescriptor,
    TransferHandle,
};
use tracing::{debug, warn};

use crate::convert::map_state;
use crate::types::codes;

#[derive(Debug, Default)]
pub(crate) struct LocalSession {
    next_handle: u64,
    transfers: BTreeMap<TransferHandle, LocalTransfer>,
    limits: RateLimits,
    paused: bool,
}

#[derive(Debug)]
struct LocalTransfer {
    name: String,
    info_hash: String,
    storage_root: PathBuf,
    files: Vec<DescriptorFile>,
    total: u64,
    on_disk: u64,
    code: i32,
}

impl LocalTransfer {
    fn refresh(&mut self) {
        match scan_bytes(&self.storage_root, &self.files) {
            Ok(on_disk) => {
                self.on_disk = on_disk;
                if on_disk >= self.total {
                    self.code = codes::FINISHED;
                }
            }
            Err(err) => {
                warn!(
                    transfer = %self.name,
                    root = %self.storage_root.display(),
                    error = %err,
                    "storage scan failed"
                );
                self.code = codes::ERROR;
            }
        }
    }

    fn progress(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.on_disk as f64 / self.total as f64;
        ratio.clamp(0.0, 1.0)
    }
}

impl LocalSession {
    pub(crate) fn new(limits: RateLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    fn transfer(&self, handle: TransferHandle) -> TorrentResult<&LocalTransfer> {
        self.transfers
            .get(&handle)
            .ok_or(TorrentError::UnknownHandle { handle })
    }

    pub(crate) fn add(
        &mut self,
        descriptor: &TransferDescriptor,
        save_path: &Path,
    ) -> TorrentResult<TransferHandle> {
        if self
            .transfers
            .values()
            .any(|existing| existing.info_hash == descriptor.info_hash())
        {
            return Err(TorrentError::DuplicateTransfer {
                info_hash: descriptor.info_hash().to_string(),
            });
        }
        fs::create_dir_all(save_path)
            .map_err(|source| TorrentError::io("create_storage_root", save_path, source))?;

        let files = descriptor.files().to_vec();
        let on_disk = scan_bytes(save_path, &files)?;
        let total = descriptor.total_length();
        let code = if on_disk >= total {
            codes::SEEDING
        } else {
            codes::DOWNLOADING
        };

        let handle = TransferHandle(self.next_handle);
        self.next_handle += 1;
        debug!(
            %handle,
            name = descriptor.name(),
            root = %save_path.display(),
            on_disk,
            total,
            "transfer registered with local session"
        );
        self.transfers.insert(
            handle,
            LocalTransfer {
                name: descriptor.name().to_string(),
                info_hash: descriptor.info_hash().to_string(),
                storage_root: save_path.to_path_buf(),
                files,
                total,
                on_disk,
                code,
            },
        );
        Ok(handle)
    }

    pub(crate) fn remove(&mut self, handle: TransferHandle, delete_files: bool) -> TorrentResult<()> {
        let transfer = self
            .transfers
            .remove(&handle)
            .ok_or(TorrentError::UnknownHandle { handle })?;
        if delete_files {
            for file in &transfer.files {
                let path = transfer.storage_root.join(file.relative_path());
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(source) => return Err(TorrentError::io("delete_payload", path, source)),
                }
            }
        }
        Ok(())
    }

    pub(crate) fn status(&self, handle: TransferHandle) -> TorrentResult<EngineStatus> {
        let transfer = self.transfer(handle)?;
        Ok(EngineStatus {
            name: transfer.name.clone(),
            progress: transfer.progress(),
            download_bps: 0,
            upload_bps: 0,
            peers: 0,
            state: map_state(transfer.code),
        })
    }

    pub(crate) const fn set_limits(&mut self, limits: RateLimits) {
        self.limits = limits;
    }

    pub(crate) const fn limits(&self) -> RateLimits {
        self.limits
    }

    pub(crate) const fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub(crate) const fn is_paused(&self) -> bool {
        self.paused
    }

    pub(crate) fn refresh(&mut self) {
        if self.paused {
            return;
        }
        for transfer in self.transfers.values_mut() {
            if transfer.code == codes::DOWNLOADING {
                transfer.refresh();
            }
        }
    }
}

fn scan_bytes(root: &Path, files: &[DescriptorFile]) -> TorrentResult<u64> {
    let mut found = 0_u64;
    for file in files {
        let path = root.join(file.relative_path());
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => found += meta.len().min(file.length),
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(TorrentError::io("scan_payload", path, source)),
        }
    }
    Ok(found)
}
