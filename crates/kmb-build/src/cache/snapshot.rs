//! Content-hash snapshots of a source tree

use crate::error::{BuildError, BuildResult};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Read size used while hashing; files are never buffered whole
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// One file of a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// Absolute file path
    pub path: PathBuf,
    /// Lowercase hex content digest
    pub digest: String,
}

/// Digest listing of every regular file under a directory, in traversal order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashSnapshot {
    entries: Vec<SnapshotEntry>,
}

impl HashSnapshot {
    /// Walk `source_dir` in file-name order and hash every regular file
    ///
    /// Symlinks are followed: a linked file is listed under its path inside
    /// the tree and hashed by its target's content. Any unreadable file,
    /// dangling link or link cycle aborts the whole pass.
    pub fn compute(source_dir: &Path) -> BuildResult<Self> {
        let root = dunce::canonicalize(source_dir).map_err(|e| BuildError::io(source_dir, e))?;
        let mut entries = Vec::new();

        for entry in WalkDir::new(&root).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| BuildError::WalkError {
                path: root.clone(),
                error: e.to_string(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            let digest = hash_file(&path)?;
            entries.push(SnapshotEntry { path, digest });
        }

        Ok(Self { entries })
    }

    /// Build a snapshot from already computed entries
    pub fn from_entries(entries: Vec<SnapshotEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as repeated `path\ndigest\n` records
    ///
    /// Paths are written lossily, so two non-UTF-8 paths that differ only in
    /// their invalid bytes share a record line. Their digests still land in
    /// the listing, and a content edit in either still changes the text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.path.display().to_string());
            out.push('\n');
            out.push_str(&entry.digest);
            out.push('\n');
        }
        out
    }

    /// Parse the two-line record format
    ///
    /// A dangling path without a digest means the file was cut short and is
    /// rejected.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut entries = Vec::new();
        let mut lines = text.lines();

        while let Some(path) = lines.next() {
            let digest = lines
                .next()
                .ok_or_else(|| format!("record for '{}' has no digest", path))?;
            entries.push(SnapshotEntry {
                path: PathBuf::from(path),
                digest: digest.to_string(),
            });
        }

        Ok(Self { entries })
    }

    /// Load a snapshot file
    pub fn load(path: &Path) -> BuildResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        Self::parse(&text).map_err(|e| {
            BuildError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    /// Write the snapshot so that `path` holds either the complete listing
    /// or nothing new: the data goes to a sibling temp file first and is
    /// renamed into place.
    pub fn write_atomic(&self, path: &Path) -> BuildResult<()> {
        let tmp_path = temp_sibling(path);

        let result = (|| -> std::io::Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(self.to_text().as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp_path, path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_path);
            return Err(BuildError::io(path, e));
        }

        Ok(())
    }
}

/// Compute the SHA-256 digest of a file with a streaming read
pub fn hash_file(path: &Path) -> BuildResult<String> {
    let mut file = File::open(path).map_err(|e| BuildError::hash(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|e| BuildError::hash(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
