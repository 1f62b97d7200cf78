// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! This module defines error types used in the installer action module.

use std::{path::PathBuf, process::ExitStatus};

use thiserror::Error;

use crate::providers::error::{CommandError, FileError};

/// Errors for the installer action layer
#[derive(Error, Debug)]
pub enum InstallerActionError {
    #[error("Source directory {0} does not exist, has 'win-pv-build fetch' been executed?")]
    MissingSource(PathBuf),
    #[error("Error parsing branding file: {0}")]
    Branding(PathBuf, #[source] serde_json::Error),
    #[error("Certificate {0} not found. If this is a test build, use the --debug flag")]
    MissingCertificate(PathBuf),
    #[error("Failed to add {0} to the certificate store. If this is a test build, use the --debug flag")]
    CertificateAdd(PathBuf, #[source] CommandError),
    #[error("Error generating test certificate {0}")]
    CertificateCreate(String, #[source] CommandError),
    #[error("Installer build in {dir} failed ({status})")]
    InstallerBuildFailed { dir: PathBuf, status: ExitStatus },
    #[error("Error reading the thumbprint of {0}")]
    Thumbprint(PathBuf, #[source] CommandError),
    #[error(
        "{cert_file}'s thumbprint ({cert_thumbprint}) does not match {signed_file}'s thumbprint \
         ({signed_thumbprint})"
    )]
    ThumbprintMismatch {
        cert_file: PathBuf,
        cert_thumbprint: String,
        signed_file: PathBuf,
        signed_thumbprint: String,
    },
    #[error(transparent)]
    FileIo(#[from] FileError),
    #[error(transparent)]
    CommandExecution(#[from] CommandError),
}
