// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! This module provides a wrapper around the file system operations needed to
//! probe for toolchains, stage installer inputs and bundle the final output.
//! It integrates with `mockall` so that toolchain discovery and installer
//! assembly can be tested without a real Windows file system.

#![allow(clippy::unused_self)]

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use tracing::debug;
use walkdir::WalkDir;
use zip::{CompressionMethod, ZipWriter, result::ZipError, write::SimpleFileOptions};

use super::error::FileError;

/// Provides limited access to `std::fs` methods
#[derive(Debug, Default)]
pub struct Fs {}

#[cfg_attr(test, mockall::automock)]
#[cfg_attr(
    test,
    allow(
        dead_code,
        reason = "This implementation is mocked in test configuration."
    )
)]
impl Fs {
    pub fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    pub fn read_to_string(&self, path: &Path) -> Result<String, FileError> {
        fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => FileError::NotFound(path.to_path_buf()),
            _ => FileError::ReadError(path.to_path_buf(), e),
        })
    }

    /// Names of the immediate subdirectories of `path`. Entries that are not
    /// valid Unicode are skipped.
    pub fn subdirectory_names(&self, path: &Path) -> Result<Vec<String>, FileError> {
        Ok(fs::read_dir(path)
            .map_err(|e| FileError::ReadDirError(path.to_path_buf(), e))?
            .flatten()
            .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_dir()))
            .filter_map(|entry| entry.file_name().to_str().map(ToString::to_string))
            .collect())
    }

    /// Walks the directory tree below `root`, at most `max_depth` levels deep,
    /// and returns the first directory that contains `marker`. Unreadable
    /// directories are skipped.
    pub fn find_dir_containing(
        &self,
        root: &Path,
        marker: &Path,
        max_depth: usize,
    ) -> Option<PathBuf> {
        debug!(
            "Scanning {} for {} (max depth {max_depth})",
            root.display(),
            marker.display()
        );
        WalkDir::new(root)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|entry| entry.file_type().is_dir())
            .filter_map(Result::ok)
            .map(walkdir::DirEntry::into_path)
            .find(|dir| dir.join(marker).exists())
    }

    pub fn create_dir_all(&self, path: &Path) -> Result<(), FileError> {
        fs::create_dir_all(path).map_err(|e| FileError::CreateDirError(path.to_path_buf(), e))
    }

    /// Creates a fresh directory under the system temp directory. The
    /// directory is kept after the process exits.
    pub fn create_temp_dir(&self, prefix: &str) -> Result<PathBuf, FileError> {
        tempfile::Builder::new()
            .prefix(prefix)
            .keep(true)
            .tempdir()
            .map(|dir| dir.path().to_path_buf())
            .map_err(|e| FileError::TempDirError(prefix.to_string(), e))
    }

    pub fn copy(&self, src: &Path, dest: &Path) -> Result<u64, FileError> {
        fs::copy(src, dest)
            .map_err(|e| FileError::CopyError(src.to_path_buf(), dest.to_path_buf(), e))
    }

    pub fn rename(&self, src: &Path, dest: &Path) -> Result<(), FileError> {
        fs::rename(src, dest)
            .map_err(|e| FileError::RenameError(src.to_path_buf(), dest.to_path_buf(), e))
    }

    /// Recursively copies the directory `src` to `dest`, returning the number
    /// of files copied.
    pub fn copy_dir_all(&self, src: &Path, dest: &Path) -> Result<u64, FileError> {
        let copy_error = |e: io::Error| FileError::CopyError(src.to_path_buf(), dest.to_path_buf(), e);
        let mut copied = 0;
        for entry in WalkDir::new(src) {
            let entry = entry.map_err(|e| copy_error(e.into()))?;
            let Ok(relative) = entry.path().strip_prefix(src) else {
                continue;
            };
            let target = dest.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(copy_error)?;
            } else {
                fs::copy(entry.path(), &target).map_err(copy_error)?;
                copied += 1;
            }
        }
        Ok(copied)
    }

    /// Writes every regular file directly inside `dir` into a new zip archive
    /// at `archive`. The archive itself is skipped when it lives in `dir`.
    /// Returns the number of files added.
    pub fn zip_dir(&self, dir: &Path, archive: &Path) -> Result<usize, FileError> {
        let archive_error = |e: ZipError| FileError::ArchiveError(archive.to_path_buf(), e);
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| FileError::ReadDirError(dir.to_path_buf(), e))?
            .flatten()
            .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_file()))
            .map(|entry| entry.path())
            .filter(|path| path.file_name() != archive.file_name())
            .collect();
        files.sort();

        let mut writer = ZipWriter::new(
            File::create(archive).map_err(|e| archive_error(ZipError::from(e)))?,
        );
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for path in &files {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();
            debug!("Adding {name} to {}", archive.display());
            writer.start_file(name, options).map_err(archive_error)?;
            let mut file = File::open(path).map_err(|e| archive_error(ZipError::from(e)))?;
            io::copy(&mut file, &mut writer).map_err(|e| archive_error(ZipError::from(e)))?;
        }
        writer.finish().map_err(archive_error)?;
        Ok(files.len())
    }
}
