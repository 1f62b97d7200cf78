// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
#![allow(clippy::ref_option_ref)] // This is suppressed for mockall as it generates mocks with env_vars: &Option
use std::{
    collections::{HashMap, HashSet},
    env::VarError,
    path::{Path, PathBuf},
    process::{ExitStatus, Output},
};

use mockall::predicate::eq;

use super::{
    BuildEnvKind, BuildEnvSetup, BuildEnvironment, EnvProbe, Wix, error::EnvProbeError,
    vs_setup_script, wix_marker,
};
use crate::{
    providers::{env::MockEnv, exec::MockCommandExec, fs::MockFs},
    test_utils::exit_status,
};

const EWDK_SCRIPT: &str = "SetupBuildEnv.cmd";

fn system_root() -> PathBuf {
    PathBuf::from("C:\\")
}

fn program_files_x86() -> PathBuf {
    system_root().join("Program Files (x86)")
}

fn kits_dir() -> PathBuf {
    program_files_x86().join("Windows Kits")
}

struct TestProbe {
    vars: HashMap<String, String>,
    existing: HashSet<PathBuf>,
    mock_env: MockEnv,
    mock_fs: MockFs,
    mock_command_exec: MockCommandExec,
}

impl TestProbe {
    fn new() -> Self {
        Self {
            vars: HashMap::new(),
            existing: HashSet::new(),
            mock_env: MockEnv::default(),
            mock_fs: MockFs::default(),
            mock_command_exec: MockCommandExec::default(),
        }
    }

    fn set_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    fn set_existing(mut self, path: PathBuf) -> Self {
        self.existing.insert(path);
        self
    }

    fn set_kits(mut self, versions: &[&str]) -> Self {
        self.existing.insert(kits_dir());
        let versions: Vec<String> = versions.iter().map(ToString::to_string).collect();
        self.mock_fs
            .expect_subdirectory_names()
            .with(eq(kits_dir()))
            .returning(move |_| Ok(versions.clone()));
        self
    }

    fn set_wix_dotnet_tool(mut self, installed: bool) -> Self {
        let code = u32::from(!installed);
        self.mock_command_exec
            .expect_output()
            .withf(
                |command: &str,
                 args: &[&str],
                 _env_vars: &Option<&HashMap<String, String>>,
                 _working_dir: &Option<&Path>|
                 -> bool { command == "wix" && args == ["--version"] },
            )
            .once()
            .returning(move |_, _, _, _| {
                Ok(Output {
                    status: exit_status(code),
                    stdout: vec![],
                    stderr: vec![],
                })
            });
        self
    }

    fn forbid_drive_scan(mut self) -> Self {
        self.mock_fs.expect_find_dir_containing().never();
        self
    }

    fn probe(mut self) -> Result<BuildEnvironment, EnvProbeError> {
        let vars = self.vars;
        self.mock_env
            .expect_var()
            .returning(move |name| vars.get(name).cloned().ok_or(VarError::NotPresent));
        let existing = self.existing;
        self.mock_fs
            .expect_exists()
            .returning(move |path| existing.contains(path));
        EnvProbe::new(&self.mock_env, &self.mock_fs, &self.mock_command_exec).probe()
    }
}

#[test]
fn given_valid_overrides_when_probing_then_nothing_is_searched() {
    let script = PathBuf::from("D:\\BuildEnv").join(EWDK_SCRIPT);

    let build_env = TestProbe::new()
        .set_var("BUILD_ENV", &script.to_string_lossy())
        .set_var("WIX", "C:\\wix")
        .set_var("KIT", "C:\\kits\\10.0")
        .set_existing(script.clone())
        .forbid_drive_scan()
        .probe()
        .unwrap();

    assert_eq!(
        build_env,
        BuildEnvironment {
            setup: BuildEnvSetup::new(script, BuildEnvKind::Ewdk),
            wix: Wix::Path(PathBuf::from("C:\\wix")),
            kit_root: PathBuf::from("C:\\kits\\10.0"),
        }
    );
}

#[test]
fn given_build_env_directory_with_vcvarsall_when_probing_then_visual_studio_is_used() {
    let vs_root = PathBuf::from("E:\\VS\\2022\\Community");

    let build_env = TestProbe::new()
        .set_var("BUILD_ENV", &vs_root.to_string_lossy())
        .set_var("WIX_DOTNET_TOOL", "1")
        .set_var("KIT", "C:\\kits\\10.0")
        .set_existing(vs_root.join(vs_setup_script()))
        .forbid_drive_scan()
        .probe()
        .unwrap();

    assert_eq!(
        build_env.setup,
        BuildEnvSetup::new(vs_root.join(vs_setup_script()), BuildEnvKind::VisualStudio)
    );
    assert_eq!(build_env.wix, Wix::DotnetTool);
}

#[test]
fn given_invalid_build_env_when_probing_then_known_locations_are_searched() {
    let ewdk_dir = PathBuf::from("D:\\").join("BuildEnv");

    let build_env = TestProbe::new()
        .set_var("BUILD_ENV", "C:\\nowhere")
        .set_var("WIX", "C:\\wix")
        .set_var("KIT", "C:\\kits\\10.0")
        .set_existing(ewdk_dir.join(EWDK_SCRIPT))
        .forbid_drive_scan()
        .probe()
        .unwrap();

    assert_eq!(
        build_env.setup,
        BuildEnvSetup::new(ewdk_dir.join(EWDK_SCRIPT), BuildEnvKind::Ewdk)
    );
}

#[test]
fn given_ewdk_and_visual_studio_when_probing_then_ewdk_is_preferred() {
    let ewdk_dir = PathBuf::from("F:\\").join("BuildEnv");
    let vs_root = system_root()
        .join("Program Files")
        .join("Microsoft Visual Studio")
        .join("2022")
        .join("Enterprise");

    let build_env = TestProbe::new()
        .set_var("WIX", "C:\\wix")
        .set_var("KIT", "C:\\kits\\10.0")
        .set_existing(vs_root.join(vs_setup_script()))
        .set_existing(ewdk_dir.join(EWDK_SCRIPT))
        .forbid_drive_scan()
        .probe()
        .unwrap();

    assert_eq!(build_env.setup.kind(), BuildEnvKind::Ewdk);
    assert_eq!(build_env.setup.script(), ewdk_dir.join(EWDK_SCRIPT));
}

#[test]
fn given_visual_studio_only_when_probing_then_vcvarsall_is_used() {
    let vs_root = system_root()
        .join("Program Files (x86)")
        .join("Microsoft Visual Studio")
        .join("2019")
        .join("BuildTools");

    let build_env = TestProbe::new()
        .set_var("WIX", "C:\\wix")
        .set_var("KIT", "C:\\kits\\10.0")
        .set_existing(vs_root.join(vs_setup_script()))
        .forbid_drive_scan()
        .probe()
        .unwrap();

    assert_eq!(
        build_env.setup,
        BuildEnvSetup::new(vs_root.join(vs_setup_script()), BuildEnvKind::VisualStudio)
    );
}

#[test]
fn given_no_build_env_anywhere_when_probing_then_drives_are_scanned_and_probe_fails() {
    let mut probe = TestProbe::new()
        .set_var("WIX", "C:\\wix")
        .set_var("KIT", "C:\\kits\\10.0")
        .set_existing(system_root());
    // One scan of C:\ for the EWDK, one for Visual Studio
    probe
        .mock_fs
        .expect_find_dir_containing()
        .with(eq(system_root()), mockall::predicate::always(), eq(5))
        .times(2)
        .returning(|_, _, _| None);

    assert!(matches!(
        probe.probe(),
        Err(EnvProbeError::BuildEnvNotFound)
    ));
}

#[test]
fn given_drive_scan_finds_ewdk_when_probing_then_script_path_is_resolved() {
    let mut probe = TestProbe::new()
        .set_var("WIX", "C:\\wix")
        .set_var("KIT", "C:\\kits\\10.0")
        .set_existing(PathBuf::from("G:\\"));
    probe
        .mock_fs
        .expect_find_dir_containing()
        .with(
            eq(PathBuf::from("G:\\")),
            eq(PathBuf::from(EWDK_SCRIPT)),
            eq(5),
        )
        .once()
        .returning(|_, _, _| Some(PathBuf::from("G:\\tools\\ewdk\\BuildEnv")));

    let build_env = probe.probe().unwrap();

    assert_eq!(
        build_env.setup.script(),
        PathBuf::from("G:\\tools\\ewdk\\BuildEnv").join(EWDK_SCRIPT)
    );
}

#[test]
fn given_wix_dotnet_tool_when_probing_then_wix_is_not_searched() {
    let script = PathBuf::from("D:\\BuildEnv").join(EWDK_SCRIPT);
    let mut probe = TestProbe::new()
        .set_var("BUILD_ENV", &script.to_string_lossy())
        .set_var("KIT", "C:\\kits\\10.0")
        .set_existing(script)
        .set_wix_dotnet_tool(true)
        .forbid_drive_scan();
    probe
        .mock_fs
        .expect_subdirectory_names()
        .never();

    let build_env = probe.probe().unwrap();

    assert_eq!(build_env.wix, Wix::DotnetTool);
    assert_eq!(
        build_env.env_vars().get("WIX_DOTNET_TOOL").map(String::as_str),
        Some("1")
    );
    assert!(!build_env.env_vars().contains_key("WIX"));
}

#[test]
fn given_no_wix_dotnet_tool_when_probing_then_wix_toolset_is_located() {
    let script = PathBuf::from("D:\\BuildEnv").join(EWDK_SCRIPT);
    let wix_root = program_files_x86().join("WiX Toolset v3.14");
    let mut probe = TestProbe::new()
        .set_var("BUILD_ENV", &script.to_string_lossy())
        .set_var("KIT", "C:\\kits\\10.0")
        .set_existing(script)
        .set_existing(program_files_x86())
        .set_existing(wix_root.join(wix_marker()))
        .set_wix_dotnet_tool(false)
        .forbid_drive_scan();
    probe
        .mock_fs
        .expect_subdirectory_names()
        .with(eq(program_files_x86()))
        .once()
        .returning(|_| {
            Ok(vec![
                "Windows Kits".to_string(),
                "WiX Toolset v3.14".to_string(),
            ])
        });

    let build_env = probe.probe().unwrap();

    assert_eq!(build_env.wix, Wix::Path(wix_root.clone()));
    assert_eq!(
        build_env.env_vars().get("WIX").map(String::as_str),
        Some(wix_root.to_string_lossy().as_ref())
    );
}

#[test]
fn given_no_wix_when_probing_then_probe_fails() {
    let script = PathBuf::from("D:\\BuildEnv").join(EWDK_SCRIPT);

    let result = TestProbe::new()
        .set_var("BUILD_ENV", &script.to_string_lossy())
        .set_var("KIT", "C:\\kits\\10.0")
        .set_existing(script)
        .set_wix_dotnet_tool(false)
        .forbid_drive_scan()
        .probe();

    assert!(matches!(result, Err(EnvProbeError::WixNotFound)));
}

#[test]
fn given_kits_10_0_and_11_0_when_probing_then_highest_kit_is_selected() {
    let script = PathBuf::from("D:\\BuildEnv").join(EWDK_SCRIPT);

    let build_env = TestProbe::new()
        .set_var("BUILD_ENV", &script.to_string_lossy())
        .set_var("WIX", "C:\\wix")
        .set_existing(script)
        .set_kits(&["10.0", "11.0"])
        .forbid_drive_scan()
        .probe()
        .unwrap();

    assert_eq!(build_env.kit_root, kits_dir().join("11.0"));
}

#[test]
fn given_kit_dir_with_padded_version_when_probing_then_its_own_name_is_used() {
    let script = PathBuf::from("D:\\BuildEnv").join(EWDK_SCRIPT);

    let build_env = TestProbe::new()
        .set_var("BUILD_ENV", &script.to_string_lossy())
        .set_var("WIX", "C:\\wix")
        .set_existing(script)
        .set_kits(&["8.1", "10.00"])
        .forbid_drive_scan()
        .probe()
        .unwrap();

    assert_eq!(build_env.kit_root, kits_dir().join("10.00"));
}

#[test]
fn given_no_kits_when_probing_then_probe_fails() {
    let script = PathBuf::from("D:\\BuildEnv").join(EWDK_SCRIPT);

    let result = TestProbe::new()
        .set_var("BUILD_ENV", &script.to_string_lossy())
        .set_var("WIX", "C:\\wix")
        .set_existing(script)
        .set_kits(&["NETFXSDK"])
        .forbid_drive_scan()
        .probe();

    assert!(matches!(result, Err(EnvProbeError::WindowsKitsNotFound)));
}

#[test]
fn ewdk_wrap_chains_setup_script_and_command() {
    let setup = BuildEnvSetup::new(
        PathBuf::from("D:\\BuildEnv\\SetupBuildEnv.cmd"),
        BuildEnvKind::Ewdk,
    );

    assert_eq!(
        setup.wrap(&["python", "win-xenguestagent\\build.py", "free"]),
        vec![
            "/C",
            "call",
            "D:\\BuildEnv\\SetupBuildEnv.cmd",
            "&&",
            "python",
            "win-xenguestagent\\build.py",
            "free",
        ]
    );
}

#[test]
fn visual_studio_wrap_selects_x86_amd64() {
    let setup = BuildEnvSetup::from_script(PathBuf::from(
        "C:\\VS\\VC\\Auxiliary\\Build\\vcvarsall.bat",
    ))
    .unwrap();

    assert_eq!(setup.kind(), BuildEnvKind::VisualStudio);
    assert_eq!(
        setup.wrap(&["powershell", "-file", "build.ps1"]),
        vec![
            "/C",
            "call",
            "C:\\VS\\VC\\Auxiliary\\Build\\vcvarsall.bat",
            "x86_amd64",
            "&&",
            "powershell",
            "-file",
            "build.ps1",
        ]
    );
}

#[test]
fn unknown_script_name_is_not_a_setup_script() {
    assert!(BuildEnvSetup::from_script(PathBuf::from("C:\\tools\\setup.cmd")).is_none());
}

#[test]
fn run_wrapped_exports_build_environment() {
    let build_env = BuildEnvironment {
        setup: BuildEnvSetup::new(
            PathBuf::from("D:\\BuildEnv\\SetupBuildEnv.cmd"),
            BuildEnvKind::Ewdk,
        ),
        wix: Wix::Path(PathBuf::from("C:\\wix")),
        kit_root: PathBuf::from("C:\\kits\\10.0"),
    };
    let mut command_exec = MockCommandExec::default();
    command_exec
        .expect_run()
        .withf(
            |command: &str,
             args: &[&str],
             env_vars: &Option<&HashMap<String, String>>,
             working_dir: &Option<&Path>|
             -> bool {
                command == "cmd.exe"
                    && args.last() == Some(&"free")
                    && env_vars.is_some_and(|vars| {
                        vars.get("BUILD_ENV").map(String::as_str)
                            == Some("D:\\BuildEnv\\SetupBuildEnv.cmd")
                            && vars.get("KIT").map(String::as_str) == Some("C:\\kits\\10.0")
                            && vars.get("WIX").map(String::as_str) == Some("C:\\wix")
                    })
                    && working_dir.is_none()
            },
        )
        .once()
        .returning(|_, _, _, _| Ok(ExitStatus::default()));

    let status = build_env
        .run_wrapped(&command_exec, &["python", "build.py", "free"], None)
        .unwrap();

    assert!(status.success());
}
