//! Test fixtures: bencoded descriptors, payload files, and scratch directories.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

const PIECE_LENGTH: u64 = 16_384;

/// Builder for bencoded `.torrent` descriptors.
///
/// A single file added with no path segments produces a single-file
/// descriptor named after the root; anything else produces a multi-file
/// layout rooted at the name.
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    name: String,
    files: Vec<(Vec<String>, u64)>,
    announce: Option<String>,
}

impl DescriptorBuilder {
    /// Start a descriptor with the given root name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            files: Vec::new(),
            announce: None,
        }
    }

    /// Add a file; an empty `segments` slice marks a single-file descriptor.
    #[must_use]
    pub fn file(mut self, segments: &[&str], length: u64) -> Self {
        self.files.push((
            segments.iter().map(|segment| (*segment).to_string()).collect(),
            length,
        ));
        self
    }

    /// Set a tracker URL outside the `info` dictionary.
    #[must_use]
    pub fn announce(mut self, url: &str) -> Self {
        self.announce = Some(url.to_string());
        self
    }

    /// Relative paths (`/`-separated) of every file, as a parser reports them.
    #[must_use]
    pub fn relative_paths(&self) -> Vec<String> {
        self.files
            .iter()
            .map(|(segments, _)| {
                if segments.is_empty() {
                    self.name.clone()
                } else {
                    format!("{}/{}", self.name, segments.join("/"))
                }
            })
            .collect()
    }

    /// Encode the descriptor.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let total: u64 = self.files.iter().map(|(_, length)| length).sum();
        let piece_count = usize::try_from(total.div_ceil(PIECE_LENGTH).max(1)).unwrap_or(1);

        let mut info = Vec::new();
        info.push(b'd');
        let single = self.files.len() == 1 && self.files[0].0.is_empty();
        if single {
            push_str(&mut info, "length");
            push_int(&mut info, self.files[0].1);
        } else {
            push_str(&mut info, "files");
            info.push(b'l');
            for (segments, length) in &self.files {
                info.push(b'd');
                push_str(&mut info, "length");
                push_int(&mut info, *length);
                push_str(&mut info, "path");
                info.push(b'l');
                for segment in segments {
                    push_str(&mut info, segment);
                }
                info.push(b'e');
                info.push(b'e');
            }
            info.push(b'e');
        }
        push_str(&mut info, "name");
        push_str(&mut info, &self.name);
        push_str(&mut info, "piece length");
        push_int(&mut info, PIECE_LENGTH);
        push_str(&mut info, "pieces");
        push_bytes(&mut info, &vec![0_u8; piece_count * 20]);
        info.push(b'e');

        let mut out = Vec::new();
        out.push(b'd');
        if let Some(announce) = &self.announce {
            push_str(&mut out, "announce");
            push_str(&mut out, announce);
        }
        push_str(&mut out, "info");
        out.extend_from_slice(&info);
        out.push(b'e');
        out
    }

    /// Write payload files of the declared lengths under `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if any file or parent directory cannot be created.
    pub fn write_payload(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (relative, (_, length)) in self.relative_paths().iter().zip(&self.files) {
            let path = relative
                .split('/')
                .fold(root.to_path_buf(), |acc, segment| acc.join(segment));
            write_file(&path, *length)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Write a file of `length` bytes, creating parent directories.
///
/// # Errors
///
/// Returns an error if the file or its parents cannot be created.
pub fn write_file(path: &Path, length: u64) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let len = usize::try_from(length).context("payload length exceeds address space")?;
    fs::write(path, vec![0xAB_u8; len])
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Create a scratch directory with a recognisable prefix.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn temp_dir() -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix("nanotorrent-")
        .tempdir()
        .context("failed to create temp dir")
}

fn push_str(out: &mut Vec<u8>, value: &str) {
    push_bytes(out, value.as_bytes());
}

fn push_bytes(out: &mut Vec<u8>, value: &[u8]) {
    out.extend_from_slice(value.len().to_string().as_bytes());
    out.push(b':');
    out.extend_from_slice(value);
}

fn push_int(out: &mut Vec<u8>, value: u64) {
    out.push(b'i');
    out.extend_from_slice(value.to_string().as_bytes());
    out.push(b'e');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_file_descriptor_uses_length_key() {
        let bytes = DescriptorBuilder::new("a.bin").file(&[], 3).build();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("d4:infod6:lengthi3e"));
        assert!(text.contains("4:name5:a.bin"));
    }

    #[test]
    fn relative_paths_include_root_for_multi_file() {
        let builder = DescriptorBuilder::new("A").file(&["x", "y.txt"], 1);
        assert_eq!(builder.relative_paths(), vec!["A/x/y.txt".to_string()]);
    }

    #[test]
    fn write_payload_creates_sized_files() -> Result<()> {
        let temp = temp_dir()?;
        let builder = DescriptorBuilder::new("A")
            .file(&["one.bin"], 4)
            .file(&["nested", "two.bin"], 2);
        let written = builder.write_payload(temp.path())?;
        assert_eq!(written.len(), 2);
        assert_eq!(fs::metadata(&written[0])?.len(), 4);
        assert_eq!(fs::metadata(temp.path().join("A/nested/two.bin"))?.len(), 2);
        Ok(())
    }
}
