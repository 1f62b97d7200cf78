// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! This module contains the `EnvProbe` struct, which discovers the native
//! build toolchain and returns it as an explicit `BuildEnvironment` value.
//! Three aspects are resolved, in order: the build environment setup script
//! (EWDK preferred over Visual Studio), WiX and the Windows Kits root. Each
//! one honors an override variable before anything is searched.

pub mod error;
pub mod locator;
#[cfg(test)]
mod tests;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    process::ExitStatus,
};

use error::EnvProbeError;
use locator::{CandidateSource, DEFAULT_SCAN_DEPTH, Locator, drive_roots};
use mockall_double::double;
use tracing::{debug, info, warn};

use crate::providers::error::CommandError;
#[double]
use crate::providers::{env::Env, exec::CommandExec, fs::Fs};

pub const BUILD_ENV_VAR: &str = "BUILD_ENV";
pub const KIT_VAR: &str = "KIT";
pub const WIX_VAR: &str = "WIX";
pub const WIX_DOTNET_TOOL_VAR: &str = "WIX_DOTNET_TOOL";

/// Shell used to chain the setup script and the wrapped command
pub const SHELL: &str = "cmd.exe";

const EWDK_SETUP_SCRIPT: &str = "SetupBuildEnv.cmd";
const VS_SETUP_SCRIPT: &str = "vcvarsall.bat";
const VS_ARCH_SELECTOR: &str = "x86_amd64";
const VS_YEARS: [&str; 3] = ["2022", "2019", "2017"];
const VS_EDITIONS: [&str; 4] = ["Enterprise", "Professional", "Community", "BuildTools"];

/// Location of `vcvarsall.bat` relative to a Visual Studio install root
#[must_use]
pub fn vs_setup_script() -> PathBuf {
    ["VC", "Auxiliary", "Build", VS_SETUP_SCRIPT].iter().collect()
}

/// Location of `candle.exe` relative to a WiX Toolset root
#[must_use]
pub fn wix_marker() -> PathBuf {
    ["bin", "candle.exe"].iter().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildEnvKind {
    Ewdk,
    VisualStudio,
}

/// Script that prepares a console for driver builds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnvSetup {
    script: PathBuf,
    kind: BuildEnvKind,
}

impl BuildEnvSetup {
    pub fn new(script: PathBuf, kind: BuildEnvKind) -> Self {
        Self { script, kind }
    }

    /// Classifies `script` by its file name, returning `None` if it is
    /// neither `SetupBuildEnv.cmd` nor `vcvarsall.bat`.
    pub fn from_script(script: PathBuf) -> Option<Self> {
        // Split on both separators so Windows paths classify on any host
        let name = script.to_string_lossy();
        let name = name.rsplit(['\\', '/']).next().unwrap_or_default();
        let kind = if name.eq_ignore_ascii_case(EWDK_SETUP_SCRIPT) {
            BuildEnvKind::Ewdk
        } else if name.eq_ignore_ascii_case(VS_SETUP_SCRIPT) {
            BuildEnvKind::VisualStudio
        } else {
            return None;
        };
        Some(Self { script, kind })
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    pub const fn kind(&self) -> BuildEnvKind {
        self.kind
    }

    /// Arguments for `cmd.exe` that run `command` only after the setup script
    /// succeeded, inheriting the environment it established.
    #[must_use]
    pub fn wrap(&self, command: &[&str]) -> Vec<String> {
        let mut args = vec![
            "/C".to_string(),
            "call".to_string(),
            self.script.to_string_lossy().to_string(),
        ];
        if self.kind == BuildEnvKind::VisualStudio {
            args.push(VS_ARCH_SELECTOR.to_string());
        }
        args.push("&&".to_string());
        args.extend(command.iter().map(ToString::to_string));
        args
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wix {
    /// `wix` is installed as a .NET global tool
    DotnetTool,
    /// WiX Toolset root directory
    Path(PathBuf),
}

/// Resolved toolchain configuration. Created once by `EnvProbe` and shared by
/// reference afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnvironment {
    pub setup: BuildEnvSetup,
    pub wix: Wix,
    pub kit_root: PathBuf,
}

impl BuildEnvironment {
    /// Variables exported to every child process. The per-repository build
    /// scripts read them.
    #[must_use]
    pub fn env_vars(&self) -> HashMap<String, String> {
        let mut vars = HashMap::from([
            (
                BUILD_ENV_VAR.to_string(),
                self.setup.script.to_string_lossy().to_string(),
            ),
            (
                KIT_VAR.to_string(),
                self.kit_root.to_string_lossy().to_string(),
            ),
        ]);
        match &self.wix {
            Wix::DotnetTool => vars.insert(WIX_DOTNET_TOOL_VAR.to_string(), "1".to_string()),
            Wix::Path(root) => vars.insert(WIX_VAR.to_string(), root.to_string_lossy().to_string()),
        };
        vars
    }

    /// Runs `command` inside the build environment.
    ///
    /// # Errors
    /// * `CommandError::Launch` - If `cmd.exe` could not be started
    pub fn run_wrapped(
        &self,
        command_exec: &CommandExec,
        command: &[&str],
        working_dir: Option<&Path>,
    ) -> Result<ExitStatus, CommandError> {
        let args = self.setup.wrap(command);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let env_vars = self.env_vars();
        command_exec.run(SHELL, &args, Some(&env_vars), working_dir)
    }
}

/// Discovers the build toolchain
pub struct EnvProbe<'a> {
    env: &'a Env,
    fs: &'a Fs,
    command_exec: &'a CommandExec,
}

impl<'a> EnvProbe<'a> {
    pub fn new(env: &'a Env, fs: &'a Fs, command_exec: &'a CommandExec) -> Self {
        Self {
            env,
            fs,
            command_exec,
        }
    }

    /// Resolves every aspect of the toolchain.
    ///
    /// # Errors
    /// * `EnvProbeError::BuildEnvNotFound` - If no EWDK or Visual Studio
    ///   installation was found
    /// * `EnvProbeError::WixNotFound` - If WiX was not found
    /// * `EnvProbeError::WindowsKitsNotFound` - If no Windows Kits version
    ///   directory was found
    pub fn probe(&self) -> Result<BuildEnvironment, EnvProbeError> {
        let setup = self.probe_build_env()?;
        info!("{BUILD_ENV_VAR} = {}", setup.script.display());

        let wix = self.probe_wix()?;
        match &wix {
            Wix::DotnetTool => info!("{WIX_DOTNET_TOOL_VAR} = 1"),
            Wix::Path(root) => info!("{WIX_VAR} = {}", root.display()),
        }

        let kit_root = self.probe_kit()?;
        info!("{KIT_VAR} = {}", kit_root.display());

        Ok(BuildEnvironment {
            setup,
            wix,
            kit_root,
        })
    }

    fn probe_build_env(&self) -> Result<BuildEnvSetup, EnvProbeError> {
        if let Some(value) = self.override_var(BUILD_ENV_VAR) {
            if let Some(setup) = self.resolve_build_env_override(Path::new(&value)) {
                debug!("Using {BUILD_ENV_VAR} from the environment");
                return Ok(setup);
            }
            warn!(
                "{BUILD_ENV_VAR} does not point to a valid build environment: {value}; searching \
                 instead"
            );
        } else {
            debug!("{BUILD_ENV_VAR} is not set");
        }

        let ewdk = Locator::new(EWDK_SETUP_SCRIPT)
            .with_source(CandidateSource::Known(self.ewdk_locations()))
            .with_source(drive_scan());
        if let Some(dir) = ewdk.locate(self.fs) {
            return Ok(BuildEnvSetup::new(
                dir.join(EWDK_SETUP_SCRIPT),
                BuildEnvKind::Ewdk,
            ));
        }

        debug!("EWDK not found, searching for a Visual Studio installation");
        let vs = Locator::new(vs_setup_script())
            .with_source(CandidateSource::Known(self.vs_locations()))
            .with_source(drive_scan());
        vs.locate(self.fs)
            .map(|dir| BuildEnvSetup::new(dir.join(vs.marker()), BuildEnvKind::VisualStudio))
            .ok_or(EnvProbeError::BuildEnvNotFound)
    }

    // Accepts the setup script itself or a directory containing one
    fn resolve_build_env_override(&self, path: &Path) -> Option<BuildEnvSetup> {
        if let Some(setup) = BuildEnvSetup::from_script(path.to_path_buf()) {
            return self.fs.exists(path).then_some(setup);
        }
        [
            (path.join(EWDK_SETUP_SCRIPT), BuildEnvKind::Ewdk),
            (path.join(vs_setup_script()), BuildEnvKind::VisualStudio),
        ]
        .into_iter()
        .find(|(script, _)| self.fs.exists(script))
        .map(|(script, kind)| BuildEnvSetup::new(script, kind))
    }

    fn probe_wix(&self) -> Result<Wix, EnvProbeError> {
        if let Some(root) = self.override_var(WIX_VAR) {
            return Ok(Wix::Path(PathBuf::from(root)));
        }
        if self.override_var(WIX_DOTNET_TOOL_VAR).is_some() {
            return Ok(Wix::DotnetTool);
        }

        debug!("{WIX_VAR} is not set, checking for the WiX .NET global tool");
        if self.is_wix_dotnet_tool_installed() {
            return Ok(Wix::DotnetTool);
        }

        debug!("WiX is not installed as a .NET global tool, searching for WiX Toolset");
        Locator::new(wix_marker())
            .with_source(CandidateSource::Children {
                parent: self.program_files_x86(),
                prefix: "WiX Toolset".to_string(),
            })
            .with_source(drive_scan())
            .locate(self.fs)
            .map(Wix::Path)
            .ok_or(EnvProbeError::WixNotFound)
    }

    fn is_wix_dotnet_tool_installed(&self) -> bool {
        let installed = self
            .command_exec
            .output("wix", &["--version"], None, None)
            .is_ok_and(|output| output.status.success());
        debug!("WiX is installed as a .NET global tool: {installed}");
        installed
    }

    fn probe_kit(&self) -> Result<PathBuf, EnvProbeError> {
        if let Some(kit) = self.override_var(KIT_VAR) {
            return Ok(PathBuf::from(kit));
        }

        let kits_dir = self.program_files_x86().join("Windows Kits");
        debug!(
            "{KIT_VAR} is not set, searching for the highest version in {}",
            kits_dir.display()
        );
        locator::find_max_version_in_directory(self.fs, &kits_dir)
            .map(|(version, name)| {
                debug!("Found Windows Kits {version} in {name}");
                kits_dir.join(name)
            })
            .ok_or(EnvProbeError::WindowsKitsNotFound)
    }

    fn override_var(&self, name: &str) -> Option<String> {
        self.env.var(name).ok().filter(|value| !value.is_empty())
    }

    fn system_root(&self) -> PathBuf {
        let drive = self
            .env
            .var("SystemDrive")
            .unwrap_or_else(|_| "C:".to_string());
        PathBuf::from(format!("{drive}\\"))
    }

    fn program_files_x86(&self) -> PathBuf {
        self.system_root().join("Program Files (x86)")
    }

    // EWDK images mount with `BuildEnv` at the drive root
    fn ewdk_locations(&self) -> Vec<PathBuf> {
        let mut locations = vec![self.system_root().join("EWDK").join("BuildEnv")];
        locations.extend(drive_roots().into_iter().map(|root| root.join("BuildEnv")));
        locations
    }

    fn vs_locations(&self) -> Vec<PathBuf> {
        let system_root = self.system_root();
        let mut locations = Vec::new();
        for program_files in ["Program Files", "Program Files (x86)"] {
            let vs_root = system_root
                .join(program_files)
                .join("Microsoft Visual Studio");
            for year in VS_YEARS {
                for edition in VS_EDITIONS {
                    locations.push(vs_root.join(year).join(edition));
                }
            }
        }
        locations
    }
}

fn drive_scan() -> CandidateSource {
    CandidateSource::DriveScan {
        drives: drive_roots(),
        max_depth: DEFAULT_SCAN_DEPTH,
    }
}
