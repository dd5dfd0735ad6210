//! Directory staging: recreate-and-copy and best-effort clearing

use crate::error::{BuildError, BuildResult};
use filetime::FileTime;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Recreate `dst` as a copy of `src`
///
/// `dst` is removed entirely first, so nothing from its previous state
/// survives. Symlinks are followed and their targets copied as regular files
/// and directories. Files keep their permissions and modification time. Any error
/// aborts the operation and is returned; a partially copied `dst` is never
/// reported as success.
pub fn remake_and_copy(src: &Path, dst: &Path) -> BuildResult<()> {
    if !src.is_dir() {
        return Err(BuildError::stage(
            src,
            dst,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "source is not a directory",
            ),
        ));
    }

    if dst.exists() {
        fs::remove_dir_all(dst).map_err(|e| BuildError::io(dst, e))?;
    }
    fs::create_dir_all(dst).map_err(|e| BuildError::io(dst, e))?;

    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| BuildError::WalkError {
            path: src.to_path_buf(),
            error: e.to_string(),
        })?;

        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| BuildError::WalkError {
                path: entry.path().to_path_buf(),
                error: e.to_string(),
            })?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| BuildError::stage(entry.path(), &target, e))?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }

    debug!("Staged {} -> {}", src.display(), dst.display());
    Ok(())
}

/// Make sure `path` exists as a directory and remove everything inside it
///
/// Entries that cannot be removed are logged and skipped. Returns how many
/// entries were left behind.
pub fn make_and_clear_dir(path: &Path) -> BuildResult<usize> {
    fs::create_dir_all(path).map_err(|e| BuildError::io(path, e))?;

    let mut failures = 0;
    for entry in fs::read_dir(path).map_err(|e| BuildError::io(path, e))? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read entry in {}: {}", path.display(), e);
                failures += 1;
                continue;
            }
        };

        let entry_path = entry.path();
        if let Err(e) = remove_entry(&entry_path) {
            warn!("Failed to clean {}: {}", entry_path.display(), e);
            failures += 1;
        }
    }

    Ok(failures)
}

/// Remove a file, symlink or directory tree
pub(crate) fn remove_entry(path: &Path) -> std::io::Result<()> {
    let file_type = fs::symlink_metadata(path)?.file_type();
    if file_type.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn copy_file(from: &Path, to: &Path) -> BuildResult<()> {
    // fs::copy carries permissions over; the timestamp is set explicitly
    fs::copy(from, to).map_err(|e| BuildError::stage(from, to, e))?;

    let metadata = fs::metadata(from).map_err(|e| BuildError::stage(from, to, e))?;
    let mtime = FileTime::from_last_modification_time(&metadata);
    filetime::set_file_mtime(to, mtime).map_err(|e| BuildError::stage(from, to, e))?;

    Ok(())
}
