// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! This module contains the `InstallerAction` struct, which assembles the
//! signed installer bundle from the driver build outputs. It stages the
//! outputs in a temporary directory, prepares the signing certificate, runs
//! the installer project's own build, checks that every artifact is signed by
//! that certificate and zips the result.

pub mod error;
pub mod identity;

use std::path::{Path, PathBuf};

use error::InstallerActionError;
use identity::CertificateIdentity;
use mockall_double::double;
use tracing::{debug, error as err, info, warn};

use crate::{
    actions::{
        BuildConfiguration,
        INSTALLER_PROJECT,
        all_projects,
        env::BuildEnvironment,
        output_dir_name,
    },
    providers::cert_store::CertStore,
};
#[double]
use crate::providers::{exec::CommandExec, fs::Fs};

pub const STAGING_PREFIX: &str = "xen_installer_";
pub const OUTPUT_DIR: &str = "output";
pub const CERTS_DIR: &str = "certs";

/// Artifacts produced by the installer build, relative to
/// `win-installer\installer`
pub const INSTALLER_ARTIFACTS: [&str; 3] = [
    "managementagentx64.msi",
    "managementagentx86.msi",
    "Setup.exe",
];

pub struct InstallerActionParams<'a> {
    pub working_dir: &'a Path,
    pub configuration: BuildConfiguration,
    pub identity: &'a CertificateIdentity,
}

/// Where the installer bundle ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerReport {
    pub output_dir: PathBuf,
    pub cert_file: PathBuf,
    pub cert_name: String,
    pub archive: PathBuf,
}

/// Action that builds the signed installer bundle
pub struct InstallerAction<'a> {
    working_dir: PathBuf,
    configuration: BuildConfiguration,
    identity: &'a CertificateIdentity,
    build_env: &'a BuildEnvironment,

    // Injected deps
    command_exec: &'a CommandExec,
    fs: &'a Fs,
    cert_store: &'a dyn CertStore,
}

impl<'a> InstallerAction<'a> {
    pub fn new(
        params: &InstallerActionParams<'a>,
        build_env: &'a BuildEnvironment,
        command_exec: &'a CommandExec,
        fs: &'a Fs,
        cert_store: &'a dyn CertStore,
    ) -> Self {
        Self {
            working_dir: params.working_dir.to_path_buf(),
            configuration: params.configuration,
            identity: params.identity,
            build_env,
            command_exec,
            fs,
            cert_store,
        }
    }

    /// Entry point method to execute the installer action flow.
    ///
    /// # Returns
    /// * `Result<InstallerReport, InstallerActionError>` - The output
    ///   directory, certificate and archive on success
    ///
    /// # Errors
    /// * `InstallerActionError::MissingSource` - If `win-installer` was not
    ///   fetched
    /// * `InstallerActionError::MissingCertificate` - If the release
    ///   certificate is not in `certs`
    /// * `InstallerActionError::CertificateAdd` - If the release certificate
    ///   could not be added to the store
    /// * `InstallerActionError::CertificateCreate` - If the test certificate
    ///   could not be generated
    /// * `InstallerActionError::InstallerBuildFailed` - If the installer build
    ///   exited with a non-zero status
    /// * `InstallerActionError::Thumbprint` - If a thumbprint could not be read
    /// * `InstallerActionError::ThumbprintMismatch` - If an artifact is not
    ///   signed by the certificate
    /// * `InstallerActionError::FileIo` - If staging, copying or zipping fails
    /// * `InstallerActionError::CommandExecution` - If the installer build
    ///   could not be launched
    pub fn run(&self) -> Result<InstallerReport, InstallerActionError> {
        let installer_dir = self.working_dir.join(INSTALLER_PROJECT);
        if !self.fs.exists(&installer_dir) {
            return Err(InstallerActionError::MissingSource(installer_dir));
        }

        let staging_dir = self.stage_dependencies(&installer_dir)?;
        let cert_file = self.prepare_certificate()?;
        self.build_installer(&installer_dir, &staging_dir)?;

        let output_dir = self.working_dir.join(OUTPUT_DIR);
        self.fs.create_dir_all(&output_dir)?;
        self.collect_artifacts(&installer_dir, &cert_file, &output_dir)?;

        let output_cert_file = output_dir.join(&self.identity.file_name);
        if self.configuration.is_debug() {
            self.fs.rename(&cert_file, &output_cert_file)?;
        } else {
            self.fs.copy(&cert_file, &output_cert_file)?;
        }

        let archive = output_dir.join(self.archive_name());
        let bundled = self.fs.zip_dir(&output_dir, &archive)?;
        debug!("Bundled {bundled} file(s)");

        info!("SUCCESS: the installer may be found here: {}", output_dir.display());
        info!("Test certificate file: {}", output_cert_file.display());
        info!("Test certificate name: {}", self.identity.name);
        info!("All output files bundled into: {}", archive.display());
        Ok(InstallerReport {
            output_dir,
            cert_file: output_cert_file,
            cert_name: self.identity.name.clone(),
            archive,
        })
    }

    // The staging directory outlives the run
    fn stage_dependencies(&self, installer_dir: &Path) -> Result<PathBuf, InstallerActionError> {
        let staging_dir = self.fs.create_temp_dir(STAGING_PREFIX)?;
        info!("Installer dependency directory: {}", staging_dir.display());

        for project in all_projects() {
            let name = output_dir_name(project);
            let src = self.working_dir.join(project).join(name);
            if !self.fs.exists(&src) {
                err!("{} does not exist, skipping", src.display());
                continue;
            }
            let copied = self.fs.copy_dir_all(&src, &staging_dir.join(name))?;
            debug!("Staged {copied} file(s) from {}", src.display());
        }

        self.fs.copy_dir_all(
            &installer_dir.join("vmcleaner"),
            &staging_dir.join("vmcleaner"),
        )?;
        Ok(staging_dir)
    }

    fn prepare_certificate(&self) -> Result<PathBuf, InstallerActionError> {
        let name = &self.identity.name;
        if let Err(e) = self.cert_store.remove(name) {
            warn!("Failed to remove certificate {name} from the store: {e}");
        }

        if self.configuration.is_debug() {
            let cert_file = self.working_dir.join(&self.identity.file_name);
            self.cert_store
                .create(name, &cert_file)
                .map_err(|e| InstallerActionError::CertificateCreate(name.clone(), e))?;
            info!("Generated test certificate {name}");
            return Ok(cert_file);
        }

        let cert_file = self
            .working_dir
            .join(CERTS_DIR)
            .join(&self.identity.file_name);
        if !self.fs.exists(&cert_file) {
            return Err(InstallerActionError::MissingCertificate(cert_file));
        }
        self.cert_store
            .add(&cert_file)
            .map_err(|e| InstallerActionError::CertificateAdd(cert_file.clone(), e))?;
        Ok(cert_file)
    }

    fn build_installer(
        &self,
        installer_dir: &Path,
        staging_dir: &Path,
    ) -> Result<(), InstallerActionError> {
        let staging_dir = staging_dir.to_string_lossy();
        let env_vars = self.build_env.env_vars();
        let status = self.command_exec.run(
            "python",
            &[
                "build.py",
                "--local",
                staging_dir.as_ref(),
                "--sign",
                self.identity.name.as_str(),
            ],
            Some(&env_vars),
            Some(installer_dir),
        )?;
        if !status.success() {
            return Err(InstallerActionError::InstallerBuildFailed {
                dir: installer_dir.to_path_buf(),
                status,
            });
        }
        Ok(())
    }

    fn collect_artifacts(
        &self,
        installer_dir: &Path,
        cert_file: &Path,
        output_dir: &Path,
    ) -> Result<(), InstallerActionError> {
        let cert_thumbprint = self
            .cert_store
            .cert_thumbprint(cert_file)
            .map_err(|e| InstallerActionError::Thumbprint(cert_file.to_path_buf(), e))?;
        let build_dir = installer_dir.join("installer");

        for artifact in INSTALLER_ARTIFACTS {
            let signed_file = build_dir.join(artifact);
            let signed_thumbprint = self
                .cert_store
                .file_thumbprint(&signed_file)
                .map_err(|e| InstallerActionError::Thumbprint(signed_file.clone(), e))?;
            info!(
                "Comparing thumbprints {} ({cert_thumbprint}) and {} ({signed_thumbprint})",
                cert_file.display(),
                signed_file.display()
            );
            if signed_thumbprint != cert_thumbprint {
                return Err(InstallerActionError::ThumbprintMismatch {
                    cert_file: cert_file.to_path_buf(),
                    cert_thumbprint,
                    signed_file,
                    signed_thumbprint,
                });
            }
            self.fs.copy(&signed_file, &output_dir.join(artifact))?;
        }
        Ok(())
    }

    // Named after the working directory, ex. `win-pv-drivers.zip`
    fn archive_name(&self) -> String {
        let stem = self
            .working_dir
            .file_name()
            .map_or_else(|| OUTPUT_DIR.into(), |name| name.to_string_lossy());
        format!("{stem}.zip")
    }
}
