//! Deploy bundle packaging
//!
//! A deploy bundle is a staged copy of the build directory reduced to an
//! allow-list of top-level names and compressed into a zip archive whose
//! single root directory is the bundle name.

use crate::error::{BuildError, BuildResult};
use crate::stage::{remake_and_copy, remove_entry};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Result of a deploy run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    /// Staged and filtered bundle directory
    pub bundle_dir: PathBuf,
    /// Written zip archive
    pub archive_path: PathBuf,
    /// Top-level names kept in the bundle, sorted
    pub members: Vec<String>,
}

/// Filters a staged tree to an allow-list and archives it
#[derive(Debug, Clone)]
pub struct DeployPackager {
    allow_list: BTreeSet<String>,
}

impl DeployPackager {
    /// Create a packager keeping only the given top-level names
    pub fn new<I, S>(allow_list: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allow_list: allow_list.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allow_list(&self) -> &BTreeSet<String> {
        &self.allow_list
    }

    /// Stage `build_dir` into `deploy_root/bundle_name`, filter it and write
    /// `deploy_root/<archive_name>.zip`
    pub fn deploy(
        &self,
        build_dir: &Path,
        deploy_root: &Path,
        bundle_name: &str,
        archive_name: &str,
    ) -> BuildResult<DeployReport> {
        let bundle_dir = deploy_root.join(bundle_name);
        remake_and_copy(build_dir, &bundle_dir)?;

        let members = self.filter(&bundle_dir)?;

        let archive_path = deploy_root.join(format!("{}.zip", archive_name));
        self.package(deploy_root, bundle_name, &archive_path)?;

        info!(
            "Packaged {} ({} entries) into {}",
            bundle_name,
            members.len(),
            archive_path.display()
        );

        Ok(DeployReport {
            bundle_dir,
            archive_path,
            members,
        })
    }

    /// Delete every top-level entry of `staged_dir` that is not allow-listed
    ///
    /// Returns the names that remain, sorted. Removal failures are fatal: a
    /// leftover entry would end up in the archive.
    pub fn filter(&self, staged_dir: &Path) -> BuildResult<Vec<String>> {
        let mut kept = Vec::new();

        for entry in fs::read_dir(staged_dir).map_err(|e| BuildError::io(staged_dir, e))? {
            let entry = entry.map_err(|e| BuildError::io(staged_dir, e))?;
            let name = entry.file_name().to_string_lossy().to_string();

            if self.allow_list.contains(&name) {
                kept.push(name);
            } else {
                let path = entry.path();
                debug!("Dropping {} from deploy bundle", path.display());
                remove_entry(&path).map_err(|e| BuildError::io(&path, e))?;
            }
        }

        kept.sort();
        Ok(kept)
    }

    /// Zip `deploy_root/bundle_name` so the archive root is `bundle_name/`
    ///
    /// Members are added in sorted path order.
    pub fn package(
        &self,
        deploy_root: &Path,
        bundle_name: &str,
        archive_path: &Path,
    ) -> BuildResult<()> {
        let bundle_dir = deploy_root.join(bundle_name);
        let file = File::create(archive_path).map_err(|e| BuildError::io(archive_path, e))?;
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in WalkDir::new(&bundle_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| BuildError::archive(archive_path, e))?;
            let relative = entry
                .path()
                .strip_prefix(deploy_root)
                .map_err(|e| BuildError::archive(archive_path, e))?;
            let name = relative.to_string_lossy().replace('\\', "/");

            if entry.file_type().is_dir() {
                zip.add_directory(format!("{}/", name), options)
                    .map_err(|e| BuildError::archive(archive_path, e))?;
                continue;
            }

            let metadata = entry
                .metadata()
                .map_err(|e| BuildError::archive(archive_path, e))?;
            zip.start_file(name, options.unix_permissions(unix_mode(&metadata)))
                .map_err(|e| BuildError::archive(archive_path, e))?;

            let mut source = File::open(entry.path()).map_err(|e| BuildError::io(entry.path(), e))?;
            io::copy(&mut source, &mut zip).map_err(|e| BuildError::archive(archive_path, e))?;
        }

        zip.finish()
            .map_err(|e| BuildError::archive(archive_path, e))?;
        Ok(())
    }
}

#[cfg(unix)]
fn unix_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn unix_mode(_metadata: &fs::Metadata) -> u32 {
    0o644
}
