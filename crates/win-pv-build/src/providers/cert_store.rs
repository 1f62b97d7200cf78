// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! Narrow interface over the Windows certificate store and Authenticode
//! inspection. `WindowsCertStore` implements it with the Windows Kits
//! `certmgr.exe`/`makecert.exe` tools and PowerShell, invoked through
//! `CommandExec`.

use std::path::{Path, PathBuf};

use mockall_double::double;
use tracing::debug;

use super::error::CommandError;
#[double]
use crate::providers::exec::CommandExec;

/// Personal store of the current user, which is where the installer build
/// looks up the signing certificate by name.
pub const PERSONAL_STORE: &str = "my";
const CODE_SIGNING_EKU: &str = "1.3.6.1.5.5.7.3.3";

/// Certificate store operations needed to sign and validate the installer
#[cfg_attr(test, mockall::automock)]
pub trait CertStore {
    /// Deletes every certificate named `cert_name` from the personal store.
    ///
    /// # Errors
    /// * `CommandError` - If `certmgr` could not be launched or failed
    fn remove(&self, cert_name: &str) -> Result<(), CommandError>;

    /// Adds the certificate in `cert_file` to the personal store.
    ///
    /// # Errors
    /// * `CommandError` - If `certmgr` could not be launched or failed
    fn add(&self, cert_file: &Path) -> Result<(), CommandError>;

    /// Generates a self-signed code signing certificate named `cert_name` in
    /// the personal store and writes it to `cert_file`.
    ///
    /// # Errors
    /// * `CommandError` - If `makecert` could not be launched or failed
    fn create(&self, cert_name: &str, cert_file: &Path) -> Result<(), CommandError>;

    /// Thumbprint of the certificate that signed `signed_file`.
    ///
    /// # Errors
    /// * `CommandError` - If the signature could not be inspected
    fn file_thumbprint(&self, signed_file: &Path) -> Result<String, CommandError>;

    /// Thumbprint of the certificate stored in `cert_file`.
    ///
    /// # Errors
    /// * `CommandError` - If the certificate could not be read
    fn cert_thumbprint(&self, cert_file: &Path) -> Result<String, CommandError>;
}

/// `CertStore` backed by the Windows Kits certificate tools
pub struct WindowsCertStore<'a> {
    certmgr: PathBuf,
    makecert: PathBuf,
    command_exec: &'a CommandExec,
}

impl<'a> WindowsCertStore<'a> {
    /// Uses the x64 tools found under the Windows Kits root `kit_root`.
    pub fn new(kit_root: &Path, command_exec: &'a CommandExec) -> Self {
        let bin_dir = kit_root.join("bin").join("x64");
        Self {
            certmgr: bin_dir.join("certmgr.exe"),
            makecert: bin_dir.join("makecert.exe"),
            command_exec,
        }
    }

    fn run_tool(&self, tool: &Path, args: &[&str]) -> Result<(), CommandError> {
        let tool = tool.to_string_lossy();
        let output = self.command_exec.output(&tool, args, None, None)?;
        if !output.status.success() {
            return Err(CommandError::from_output(&tool, args, &output));
        }
        Ok(())
    }

    fn powershell(&self, script: &str) -> Result<String, CommandError> {
        let args = ["-NoProfile", "-Command", script];
        let output = self
            .command_exec
            .output("powershell.exe", &args, None, None)?;
        if !output.status.success() {
            return Err(CommandError::from_output("powershell.exe", &args, &output));
        }
        let thumbprint = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("PowerShell returned thumbprint {thumbprint}");
        Ok(thumbprint)
    }
}

impl CertStore for WindowsCertStore<'_> {
    fn remove(&self, cert_name: &str) -> Result<(), CommandError> {
        self.run_tool(
            &self.certmgr,
            &[
                "-del",
                "-all",
                "-n",
                cert_name,
                "-s",
                "-r",
                "currentUser",
                "-c",
                PERSONAL_STORE,
            ],
        )
    }

    fn add(&self, cert_file: &Path) -> Result<(), CommandError> {
        let cert_file = cert_file.to_string_lossy();
        self.run_tool(
            &self.certmgr,
            &[
                "-add",
                &cert_file,
                "-s",
                "-r",
                "currentUser",
                PERSONAL_STORE,
            ],
        )
    }

    fn create(&self, cert_name: &str, cert_file: &Path) -> Result<(), CommandError> {
        let subject = format!("CN={cert_name}");
        let cert_file = cert_file.to_string_lossy();
        self.run_tool(
            &self.makecert,
            &[
                "-r",
                "-pe",
                "-ss",
                PERSONAL_STORE,
                "-n",
                &subject,
                "-eku",
                CODE_SIGNING_EKU,
                &cert_file,
            ],
        )
    }

    fn file_thumbprint(&self, signed_file: &Path) -> Result<String, CommandError> {
        self.powershell(&format!(
            "(Get-AuthenticodeSignature -FilePath {}).SignerCertificate.Thumbprint",
            quote(signed_file)
        ))
    }

    fn cert_thumbprint(&self, cert_file: &Path) -> Result<String, CommandError> {
        self.powershell(&format!(
            "(New-Object System.Security.Cryptography.X509Certificates.X509Certificate2 \
             {}).Thumbprint",
            quote(cert_file)
        ))
    }
}

// PowerShell single quoted string literal
fn quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', "''"))
}
