// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! This module defines error types used in the fetch action module.

use std::{fmt, process::ExitStatus};

use thiserror::Error;

use crate::providers::error::CommandError;

/// A `git clone` that exited with a non-zero status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedClone {
    pub url: String,
    pub branch: String,
    pub status: ExitStatus,
}

impl fmt::Display for FailedClone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at branch {} ({})", self.url, self.branch, self.status)
    }
}

fn list(failed: &[FailedClone]) -> String {
    failed
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors for the fetch action layer
#[derive(Error, Debug)]
pub enum FetchActionError {
    #[error("Error querying the current repository with git")]
    GitQuery(#[source] CommandError),
    #[error("Failed to clone {} repositor(ies): {}", .0.len(), list(.0))]
    CloneFailed(Vec<FailedClone>),
    #[error(transparent)]
    CommandExecution(#[from] CommandError),
}
