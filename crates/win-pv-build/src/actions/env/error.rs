// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! This module defines error types used while probing the build toolchain.

use thiserror::Error;

/// Errors for the environment probing layer
#[derive(Error, Debug)]
pub enum EnvProbeError {
    #[error(
        "Neither an EWDK nor a Visual Studio installation was found. Set BUILD_ENV to the path \
         of SetupBuildEnv.cmd or vcvarsall.bat"
    )]
    BuildEnvNotFound,
    #[error(
        "WiX was not found. Install it as a .NET tool, or set WIX to the WiX Toolset root \
         directory"
    )]
    WixNotFound,
    #[error(
        "Windows Kits were not found. Set KIT to the Windows Kits version directory, ex. \
         C:\\Program Files (x86)\\Windows Kits\\10.0"
    )]
    WindowsKitsNotFound,
}
