//! Two-generation snapshot comparison

use super::snapshot::HashSnapshot;
use super::{PREVIOUS_SNAPSHOT_FILE, SNAPSHOT_FILE};
use crate::error::{BuildError, BuildResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Why a source tree counts as changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    /// No snapshot was recorded before
    FirstRun,
    /// The serialized snapshots differ in size
    SizeDiffers,
    /// Same size, different bytes
    ContentDiffers,
}

/// Outcome of a change check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeVerdict {
    Changed(ChangeReason),
    Unchanged,
}

impl ChangeVerdict {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }
}

/// Detects source changes between invocations by comparing persisted
/// snapshots
///
/// The snapshot is rotated (`current` -> `previous`) before recomputing, so
/// after every check `current` describes the tree as it is now.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    source_dir: PathBuf,
    current_path: PathBuf,
    previous_path: PathBuf,
}

impl ChangeDetector {
    /// Create a detector with explicit snapshot locations
    pub fn new(
        source_dir: impl Into<PathBuf>,
        current_path: impl Into<PathBuf>,
        previous_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            current_path: current_path.into(),
            previous_path: previous_path.into(),
        }
    }

    /// Create a detector keeping its snapshots in the build directory
    pub fn for_build_dir(source_dir: impl Into<PathBuf>, build_dir: &Path) -> Self {
        Self::new(
            source_dir,
            build_dir.join(SNAPSHOT_FILE),
            build_dir.join(PREVIOUS_SNAPSHOT_FILE),
        )
    }

    pub fn current_path(&self) -> &Path {
        &self.current_path
    }

    pub fn previous_path(&self) -> &Path {
        &self.previous_path
    }

    /// Check whether the source tree changed since the last check
    pub fn did_files_change(&self) -> BuildResult<ChangeVerdict> {
        if !self.current_path.exists() {
            info!(
                "No source snapshot at {}, treating as changed",
                self.current_path.display()
            );
            self.record()?;
            return Ok(ChangeVerdict::Changed(ChangeReason::FirstRun));
        }

        self.rotate()?;
        self.record()?;

        let current_len = file_len(&self.current_path)?;
        let previous_len = file_len(&self.previous_path)?;
        if current_len != previous_len {
            debug!(current_len, previous_len, "Snapshot sizes differ");
            return Ok(ChangeVerdict::Changed(ChangeReason::SizeDiffers));
        }

        let current = fs::read(&self.current_path).map_err(|e| BuildError::io(&self.current_path, e))?;
        let previous =
            fs::read(&self.previous_path).map_err(|e| BuildError::io(&self.previous_path, e))?;
        if current != previous {
            return Ok(ChangeVerdict::Changed(ChangeReason::ContentDiffers));
        }

        Ok(ChangeVerdict::Unchanged)
    }

    /// Recompute and persist the current snapshot without comparing
    pub fn record(&self) -> BuildResult<HashSnapshot> {
        let snapshot = HashSnapshot::compute(&self.source_dir)?;
        snapshot.write_atomic(&self.current_path)?;
        debug!(
            files = snapshot.len(),
            "Wrote source snapshot {}",
            self.current_path.display()
        );
        Ok(snapshot)
    }

    /// Drop the current snapshot so the next check reports a first run
    ///
    /// Used when a build fails after its snapshot was written; the recorded
    /// tree never produced a successful build.
    pub fn invalidate(&self) {
        match fs::remove_file(&self.current_path) {
            Ok(()) => debug!("Removed source snapshot {}", self.current_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove source snapshot {}: {}",
                self.current_path.display(),
                e
            ),
        }
    }

    /// Move `current` over `previous`
    fn rotate(&self) -> BuildResult<()> {
        if self.previous_path.exists() {
            fs::remove_file(&self.previous_path)
                .map_err(|e| BuildError::io(&self.previous_path, e))?;
        }
        fs::rename(&self.current_path, &self.previous_path)
            .map_err(|e| BuildError::io(&self.current_path, e))
    }
}

fn file_len(path: &Path) -> BuildResult<u64> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| BuildError::io(path, e))
}
