//! Source-tree change detection for `--ifchanged` builds
//!
//! A [`HashSnapshot`] lists every regular file of the source tree with its
//! content digest. The [`ChangeDetector`] keeps two generations of it on disk
//! and compares them to decide whether a rebuild is needed.

pub mod detector;
pub mod snapshot;

pub use detector::{ChangeDetector, ChangeReason, ChangeVerdict};
pub use snapshot::{hash_file, HashSnapshot, SnapshotEntry};

/// File name of the current snapshot inside the build directory
pub const SNAPSHOT_FILE: &str = "src_hashes";

/// File name of the rotated previous snapshot inside the build directory
pub const PREVIOUS_SNAPSHOT_FILE: &str = "src_hashes_old";
