// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! Error types returned by the providers.

use std::{
    io::Error,
    path::PathBuf,
    process::{ExitStatus, Output},
};

/// Error type for `std::process::Command` execution failures
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Failed to launch '{command}' with args {args:?}: {source}")]
    Launch {
        command: String,
        args: Vec<String>,
        #[source]
        source: Error,
    },
    #[error("Command '{command}' with args {args:?} failed ({status}) \n STDOUT: {stdout}")]
    CommandFailed {
        command: String,
        args: Vec<String>,
        status: ExitStatus,
        stdout: String,
    },
}

impl CommandError {
    pub fn from_io_error(command: &str, args: &[&str], source: Error) -> Self {
        Self::Launch {
            command: command.to_string(),
            args: args.iter().map(|&s| s.to_string()).collect(),
            source,
        }
    }

    pub fn from_output(command: &str, args: &[&str], output: &Output) -> Self {
        Self::CommandFailed {
            command: command.to_string(),
            args: args.iter().map(|&s| s.to_string()).collect(),
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        }
    }
}

/// Error type for `std::fs` operations
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("File not found error: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read file: {0}")]
    ReadError(PathBuf, #[source] Error),
    #[error("Failed to read directory: {0}")]
    ReadDirError(PathBuf, #[source] Error),
    #[error("Failed to create directory: {0}")]
    CreateDirError(PathBuf, #[source] Error),
    #[error("Failed to create temporary directory with prefix {0}")]
    TempDirError(String, #[source] Error),
    #[error("Failed to copy {0} to {1}")]
    CopyError(PathBuf, PathBuf, #[source] Error),
    #[error("Failed to move {0} to {1}")]
    RenameError(PathBuf, PathBuf, #[source] Error),
    #[error("Failed to write archive: {0}")]
    ArchiveError(PathBuf, #[source] zip::result::ZipError),
}
