// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! Branding and the test signing certificate identity derived from it.

use std::path::Path;

use chrono::{DateTime, Local};
use mockall_double::double;
use serde::Deserialize;
use tracing::debug;

use super::error::InstallerActionError;
use crate::providers::error::FileError;
#[double]
use crate::providers::fs::Fs;

pub const BRANDING_FILE: &str = "branding.json";
pub const DEFAULT_MANUFACTURER: &str = "XCP-ng";

/// Format of the timestamp embedded in certificate names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Branding {
    pub manufacturer: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            manufacturer: DEFAULT_MANUFACTURER.to_string(),
        }
    }
}

impl Branding {
    /// Reads `branding.json` from `working_dir`, falling back to the default
    /// branding when the file does not exist.
    ///
    /// # Errors
    /// * `InstallerActionError::Branding` - If the file is not valid JSON
    /// * `InstallerActionError::FileIo` - If the file could not be read
    pub fn load(fs: &Fs, working_dir: &Path) -> Result<Self, InstallerActionError> {
        let path = working_dir.join(BRANDING_FILE);
        match fs.read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| InstallerActionError::Branding(path, e)),
            Err(FileError::NotFound(_)) => {
                debug!("{} not found, using default branding", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Name of the signing certificate and the file it is stored in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateIdentity {
    pub name: String,
    pub file_name: String,
}

impl CertificateIdentity {
    pub fn new(branding: &Branding, started_at: &DateTime<Local>) -> Self {
        let timestamp = started_at.format(TIMESTAMP_FORMAT);
        Self {
            name: format!("{}(test)-{timestamp}", branding.manufacturer),
            file_name: format!("{}-{timestamp}.cer", branding.manufacturer),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::TimeZone;
    use mockall::predicate::eq;

    use super::*;

    #[test]
    fn identity_embeds_manufacturer_and_timestamp() {
        let started_at = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();

        let identity = CertificateIdentity::new(&Branding::default(), &started_at);

        assert_eq!(identity.name, "XCP-ng(test)-20240307-090501");
        assert_eq!(identity.file_name, "XCP-ng-20240307-090501.cer");
    }

    #[test]
    fn missing_branding_file_uses_default_manufacturer() {
        let working_dir = PathBuf::from("C:\\src");
        let mut fs = Fs::default();
        fs.expect_read_to_string()
            .with(eq(working_dir.join(BRANDING_FILE)))
            .returning(|path| Err(FileError::NotFound(path.to_path_buf())));

        assert_eq!(
            Branding::load(&fs, &working_dir).unwrap(),
            Branding::default()
        );
    }

    #[test]
    fn branding_file_sets_manufacturer() {
        let mut fs = Fs::default();
        fs.expect_read_to_string()
            .returning(|_| Ok(r#"{ "manufacturer": "Vates", "product": "PV" }"#.to_string()));

        let branding = Branding::load(&fs, Path::new("C:\\src")).unwrap();

        assert_eq!(branding.manufacturer, "Vates");
    }

    #[test]
    fn malformed_branding_file_is_an_error() {
        let mut fs = Fs::default();
        fs.expect_read_to_string()
            .returning(|_| Ok("{ manufacturer: ".to_string()));

        assert!(matches!(
            Branding::load(&fs, Path::new("C:\\src")),
            Err(InstallerActionError::Branding(..))
        ));
    }
}
