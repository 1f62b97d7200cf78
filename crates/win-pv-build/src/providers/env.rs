// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! This module provides a wrapper around a subset of `std::env` methods,
//! offering a simplified and testable interface for reading the toolchain
//! override variables and the working directory.
//! It also integrates with `mockall` to enable mocking for unit tests.

#![allow(clippy::unused_self)]

use std::path::PathBuf;

/// Provides limited access to `std::env` methods
#[derive(Debug, Default)]
pub struct Env {}

#[cfg_attr(test, mockall::automock)]
#[cfg_attr(
    test,
    allow(
        dead_code,
        reason = "This implementation is mocked in test configuration."
    )
)]
impl Env {
    pub fn var(&self, var: &str) -> Result<String, std::env::VarError> {
        std::env::var(var)
    }

    pub fn current_dir(&self) -> std::io::Result<PathBuf> {
        std::env::current_dir()
    }

    /// Directory holding the running executable, used to locate the shared
    /// `build.ps1` script that ships next to it.
    pub fn current_exe_dir(&self) -> Option<PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(std::path::Path::to_path_buf))
    }
}
