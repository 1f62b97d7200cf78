// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! This module defines error types used in the build action module.

use std::{path::PathBuf, process::ExitStatus};

use thiserror::Error;

use crate::providers::error::CommandError;

/// Errors for the build action layer
#[derive(Error, Debug)]
pub enum BuildActionError {
    #[error("Project(s) {} not valid. Options are: {}", .invalid.join(", "), .options.join(", "))]
    InvalidProjects {
        invalid: Vec<String>,
        options: Vec<String>,
    },
    #[error("Source directory {0} does not exist, has 'win-pv-build fetch' been executed?")]
    MissingSource(PathBuf),
    #[error("Built {built} projects, but building {project} failed ({status}). Stopped.")]
    ProjectFailed {
        built: usize,
        project: String,
        status: ExitStatus,
    },
    #[error(transparent)]
    CommandExecution(#[from] CommandError),
}
