// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! This module provides a standardized and testable interface for command
//! execution and error handling. It wraps the `std::process::Command` to
//! simplify usage and ensure every invocation is logged the same way, before
//! and after it runs. The use of `mockall` enables mocking the `CommandExec`
//! struct for unit testing.

// Suppression added for mockall as it generates mocks with env_vars: &Option
#![allow(clippy::ref_option_ref)]
#![allow(clippy::unused_self)]

use std::{
    collections::HashMap,
    path::Path,
    process::{Command, ExitStatus, Output, Stdio},
};

use tracing::{debug, error, info};

use super::error::CommandError;

/// Provides limited access to `std::process::Command` methods
#[derive(Debug, Default)]
pub struct CommandExec {}

#[cfg_attr(test, mockall::automock)]
#[cfg_attr(
    test,
    allow(
        dead_code,
        reason = "This implementation is mocked in test configuration."
    )
)]
impl CommandExec {
    /// Runs `command` with the console attached, so long running build output
    /// is streamed to the user. A non-zero exit status is returned as `Ok` for
    /// the caller to interpret.
    ///
    /// # Errors
    /// * `CommandError::Launch` - If the process could not be started
    pub fn run<'a>(
        &self,
        command: &'a str,
        args: &'a [&'a str],
        env_vars: Option<&'a HashMap<String, String>>,
        working_dir: Option<&'a Path>,
    ) -> Result<ExitStatus, CommandError> {
        log_invocation(command, args, working_dir);
        let status = build_command(command, args, env_vars, working_dir)
            .status()
            .map_err(|e| launch_failed(command, args, e))?;
        info!("Invoked(status={status}): {command} {args:?}");
        Ok(status)
    }

    /// Runs `command` and captures its stdout and stderr. A non-zero exit
    /// status is returned as `Ok` for the caller to interpret.
    ///
    /// # Errors
    /// * `CommandError::Launch` - If the process could not be started
    pub fn output<'a>(
        &self,
        command: &'a str,
        args: &'a [&'a str],
        env_vars: Option<&'a HashMap<String, String>>,
        working_dir: Option<&'a Path>,
    ) -> Result<Output, CommandError> {
        log_invocation(command, args, working_dir);
        let output = build_command(command, args, env_vars, working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .and_then(std::process::Child::wait_with_output)
            .map_err(|e| launch_failed(command, args, e))?;
        info!("Invoked(status={}): {command} {args:?}", output.status);
        debug!(
            "COMMAND: {}\n ARGS:{:?}\n OUTPUT: {}\n",
            command,
            args,
            String::from_utf8_lossy(&output.stdout)
        );
        Ok(output)
    }
}

fn build_command(
    command: &str,
    args: &[&str],
    env_vars: Option<&HashMap<String, String>>,
    working_dir: Option<&Path>,
) -> Command {
    let mut cmd = Command::new(command);
    cmd.args(args);
    if let Some(env) = env_vars {
        cmd.envs(env);
    }
    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }
    cmd
}

// Environment variables are never logged.
fn log_invocation(command: &str, args: &[&str], working_dir: Option<&Path>) {
    match working_dir {
        Some(dir) => info!("Invoking: {command} {args:?} (in {})", dir.display()),
        None => info!("Invoking: {command} {args:?}"),
    }
}

fn launch_failed(command: &str, args: &[&str], e: std::io::Error) -> CommandError {
    error!("Failed to launch {command} {args:?}: {e}");
    CommandError::from_io_error(command, args, e)
}
