// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
use std::fmt;

/// Business logic is divided into the following action modules
/// * `env` - Toolchain discovery
/// * `fetch` - Fetch action module
/// * `build` - Build action module
/// * `installer` - Installer assembly, run as the last step of `build`
pub mod build;
pub mod env;
pub mod fetch;
pub mod installer;

/// Remote URLs of the driver repositories. The order is the build order.
pub const PROJECT_URLS: [&str; 9] = [
    "https://github.com/xcp-ng/win-xenbus.git",
    "https://github.com/xcp-ng/win-xeniface.git",
    "https://github.com/xcp-ng/win-xenvif.git",
    "https://github.com/xcp-ng/win-xennet.git",
    "https://github.com/xcp-ng/win-xenvbd.git",
    "https://github.com/xcp-ng/win-xenvkbd.git",
    "https://github.com/xcp-ng/win-xenhid.git",
    "https://github.com/xcp-ng/win-xencons.git",
    "https://github.com/xcp-ng/win-xenguestagent.git",
];

pub const INSTALLER_URL: &str = "https://github.com/xcp-ng/win-installer.git";
pub const INSTALLER_PROJECT: &str = "win-installer";

/// Built with its own `build.py` instead of the shared `build.ps1`
pub const GUEST_AGENT_PROJECT: &str = "win-xenguestagent";

pub const DEFAULT_BRANCH: &str = "master";

/// Last path segment of `url`, without a trailing `.git`
#[must_use]
pub fn url_to_simple_name(url: &str) -> &str {
    let name = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
    name.strip_suffix(".git").unwrap_or(name)
}

/// Driver project names in build order
#[must_use]
pub fn all_projects() -> Vec<&'static str> {
    PROJECT_URLS.iter().map(|url| url_to_simple_name(url)).collect()
}

/// Directory name of a project's build output, ex. `xenbus` for
/// `win-xenbus`
#[must_use]
pub fn output_dir_name(project: &str) -> &str {
    project.strip_prefix("win-").unwrap_or(project)
}

/// `BuildConfiguration` for the action layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildConfiguration {
    Checked,
    Free,
}

impl BuildConfiguration {
    #[must_use]
    pub const fn from_debug(debug: bool) -> Self {
        if debug { Self::Checked } else { Self::Free }
    }

    #[must_use]
    pub const fn is_debug(self) -> bool {
        matches!(self, Self::Checked)
    }
}

impl fmt::Display for BuildConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Checked => "checked",
            Self::Free => "free",
        };
        write!(f, "{s}")
    }
}
