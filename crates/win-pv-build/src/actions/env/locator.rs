// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! Pluggable marker file lookup used by the environment prober. A `Locator`
//! probes an ordered list of candidate sources and stops at the first
//! directory that contains its marker file.

use std::{
    cmp::Reverse,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use mockall_double::double;
use tracing::debug;

#[double]
use crate::providers::fs::Fs;

/// Default depth limit for drive scans. Deep enough for
/// `Program Files\Microsoft Visual Studio\<year>\<edition>`.
pub const DEFAULT_SCAN_DEPTH: usize = 5;

/// Roots of all drive letters, `A:\` to `Z:\`.
#[must_use]
pub fn drive_roots() -> Vec<PathBuf> {
    ('A'..='Z')
        .map(|letter| PathBuf::from(format!("{letter}:\\")))
        .collect()
}

/// Where a `Locator` looks for its marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    /// Fixed directories, probed in order
    Known(Vec<PathBuf>),
    /// Subdirectories of `parent` whose name starts with `prefix`, probed from
    /// the highest version suffix down (ex. `WiX Toolset v3.14` before `v3.9`)
    Children { parent: PathBuf, prefix: String },
    /// Bounded walk of every existing drive root
    DriveScan {
        drives: Vec<PathBuf>,
        max_depth: usize,
    },
}

/// Finds the first directory containing `marker`, a path relative to the
/// directory being probed.
#[derive(Debug, Clone)]
pub struct Locator {
    marker: PathBuf,
    sources: Vec<CandidateSource>,
}

impl Locator {
    pub fn new(marker: impl Into<PathBuf>) -> Self {
        Self {
            marker: marker.into(),
            sources: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: CandidateSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn marker(&self) -> &Path {
        &self.marker
    }

    /// Returns the directory containing the marker, trying every source in
    /// the order it was added.
    pub fn locate(&self, fs: &Fs) -> Option<PathBuf> {
        self.sources
            .iter()
            .find_map(|source| self.locate_in(source, fs))
    }

    fn locate_in(&self, source: &CandidateSource, fs: &Fs) -> Option<PathBuf> {
        debug!("Looking for {} in {source}", self.marker.display());
        match source {
            CandidateSource::Known(dirs) => dirs
                .iter()
                .find(|dir| fs.exists(&dir.join(&self.marker)))
                .cloned(),
            CandidateSource::Children { parent, prefix } => {
                if !fs.exists(parent) {
                    return None;
                }
                let mut names = fs.subdirectory_names(parent).ok()?;
                names.retain(|name| name.starts_with(prefix.as_str()));
                names.sort_by_cached_key(|name| {
                    Reverse((version_suffix(name, prefix), name.clone()))
                });
                names
                    .into_iter()
                    .map(|name| parent.join(name))
                    .find(|dir| fs.exists(&dir.join(&self.marker)))
            }
            CandidateSource::DriveScan { drives, max_depth } => drives
                .iter()
                .filter(|drive| fs.exists(drive))
                .find_map(|drive| fs.find_dir_containing(drive, &self.marker, *max_depth)),
        }
    }
}

// Dotted numeric version after `prefix`, ex. `[3, 14]` for
// `WiX Toolset v3.14`
fn version_suffix(name: &str, prefix: &str) -> Option<Vec<u32>> {
    let suffix = name.strip_prefix(prefix)?.trim_start();
    let suffix = suffix.strip_prefix(['v', 'V']).unwrap_or(suffix);
    suffix
        .split('.')
        .map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            part.parse::<u32>().ok()
        })
        .collect()
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(dirs) => write!(f, "{} known location(s)", dirs.len()),
            Self::Children { parent, prefix } => {
                write!(f, "{}\\{prefix}*", parent.display())
            }
            Self::DriveScan { drives, max_depth } => {
                write!(f, "{} drive(s) up to depth {max_depth}", drives.len())
            }
        }
    }
}

/// Version of the form `major.minor`, as used by the `Windows Kits`
/// directory names
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TwoPartVersion(pub u32, pub u32);

impl FromStr for TwoPartVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .split_once('.')
            .ok_or_else(|| format!("'{s}' is not a major.minor version"))?;
        let parse = |part: &str| {
            part.parse::<u32>()
                .map_err(|e| format!("'{s}' is not a major.minor version: {e}"))
        };
        Ok(Self(parse(major)?, parse(minor)?))
    }
}

impl fmt::Display for TwoPartVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0, self.1)
    }
}

/// Highest `major.minor` subdirectory of `parent`, if any, along with the
/// directory name as it is spelled on disk.
pub fn find_max_version_in_directory(
    fs: &Fs,
    parent: &Path,
) -> Option<(TwoPartVersion, String)> {
    if !fs.exists(parent) {
        return None;
    }
    fs.subdirectory_names(parent)
        .ok()?
        .into_iter()
        .filter_map(|name| Some((name.parse::<TwoPartVersion>().ok()?, name)))
        .max()
}
