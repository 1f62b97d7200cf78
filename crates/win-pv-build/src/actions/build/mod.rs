// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! This module contains the `BuildAction` struct and its associated methods
//! for building the driver repositories in their canonical order. Project
//! selection is validated when the action is created, so an invalid request
//! fails before the toolchain is probed or any process is started. The build
//! itself is a small state machine that stops at the first failing project.

pub mod error;

use std::{
    path::{Path, PathBuf},
    process::ExitStatus,
};

use error::BuildActionError;
use mockall_double::double;
use tracing::{debug, info};

use crate::actions::{
    BuildConfiguration,
    GUEST_AGENT_PROJECT,
    INSTALLER_PROJECT,
    all_projects,
    env::BuildEnvironment,
};
#[double]
use crate::providers::{env::Env, exec::CommandExec, fs::Fs};

/// Shared build script used for every project except the guest agent
pub const BUILD_SCRIPT: &str = "build.ps1";

/// Progress of a build run. `Running` and `Failed` carry the index of the
/// current project among the selected ones, which is also the number of
/// projects built before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Running(usize),
    Failed(usize),
    Done,
}

impl BuildState {
    /// Moves on to the next project, or to `Done` once `total` projects are
    /// built.
    #[must_use]
    pub const fn advance(self, total: usize) -> Self {
        let next = match self {
            Self::Idle => 0,
            Self::Running(index) => index + 1,
            Self::Failed(_) | Self::Done => return self,
        };
        if next < total {
            Self::Running(next)
        } else {
            Self::Done
        }
    }

    #[must_use]
    pub const fn fail(self) -> Self {
        match self {
            Self::Running(index) => Self::Failed(index),
            _ => self,
        }
    }
}

pub struct BuildActionParams<'a> {
    pub working_dir: &'a Path,
    pub projects: &'a [String],
    pub configuration: BuildConfiguration,
    pub sdv: bool,
}

/// Action that builds the selected driver projects
pub struct BuildAction<'a> {
    working_dir: PathBuf,
    selected: Vec<&'static str>,
    installer_requested: bool,
    configuration: BuildConfiguration,
    sdv: bool,

    // Injected deps
    env: &'a Env,
    command_exec: &'a CommandExec,
    fs: &'a Fs,
}

impl<'a> BuildAction<'a> {
    /// Creates a new instance of `BuildAction`. An empty project list selects
    /// every driver project, but not the installer.
    ///
    /// # Errors
    /// * `BuildActionError::InvalidProjects` - If any requested name is
    ///   neither a driver project nor the installer
    pub fn new(
        params: &BuildActionParams<'_>,
        env: &'a Env,
        command_exec: &'a CommandExec,
        fs: &'a Fs,
    ) -> Result<Self, BuildActionError> {
        let projects = all_projects();
        let mut invalid: Vec<String> = Vec::new();
        for requested in params.projects {
            if requested != INSTALLER_PROJECT
                && !projects.contains(&requested.as_str())
                && !invalid.contains(requested)
            {
                invalid.push(requested.clone());
            }
        }
        if !invalid.is_empty() {
            let mut options: Vec<String> = projects.iter().map(ToString::to_string).collect();
            options.push(INSTALLER_PROJECT.to_string());
            return Err(BuildActionError::InvalidProjects { invalid, options });
        }

        let selected = if params.projects.is_empty() {
            projects
        } else {
            projects
                .into_iter()
                .filter(|project| params.projects.iter().any(|p| p == project))
                .collect()
        };

        Ok(Self {
            working_dir: params.working_dir.to_path_buf(),
            selected,
            installer_requested: params.projects.iter().any(|p| p == INSTALLER_PROJECT),
            configuration: params.configuration,
            sdv: params.sdv,
            env,
            command_exec,
            fs,
        })
    }

    /// Driver projects to build, in build order
    pub fn selected_projects(&self) -> &[&'static str] {
        &self.selected
    }

    /// Whether the installer should be assembled after the driver projects
    pub const fn installer_requested(&self) -> bool {
        self.installer_requested
    }

    /// Entry point method to execute the build action flow.
    ///
    /// # Errors
    /// * `BuildActionError::MissingSource` - If a project directory does not
    ///   exist
    /// * `BuildActionError::ProjectFailed` - If a project build exited with a
    ///   non-zero status
    /// * `BuildActionError::CommandExecution` - If a build could not be
    ///   launched
    pub fn run(&self, build_env: &BuildEnvironment) -> Result<(), BuildActionError> {
        for project in all_projects() {
            let source_dir = self.working_dir.join(project);
            if !self.fs.exists(&source_dir) {
                return Err(BuildActionError::MissingSource(source_dir));
            }
        }

        let build_script = self.build_script();
        debug!("Using build script {}", build_script.display());

        let total = self.selected.len();
        let mut state = BuildState::Idle.advance(total);
        while let BuildState::Running(index) = state {
            let project = self.selected[index];
            info!("Building {project} ({}/{total})", index + 1);
            let status = self.build_project(project, &build_script, build_env)?;
            if !status.success() {
                state = state.fail();
                debug!("Build stopped in state {state:?}");
                return Err(BuildActionError::ProjectFailed {
                    built: index,
                    project: project.to_string(),
                    status,
                });
            }
            state = state.advance(total);
        }

        info!("Built {total} project(s)");
        Ok(())
    }

    fn build_project(
        &self,
        project: &str,
        build_script: &Path,
        build_env: &BuildEnvironment,
    ) -> Result<ExitStatus, BuildActionError> {
        let configuration = self.configuration.to_string();
        let status = if project == GUEST_AGENT_PROJECT {
            let script = Path::new(project).join("build.py");
            let script = script.to_string_lossy();
            let env_vars = build_env.env_vars();
            self.command_exec.run(
                "python",
                &[script.as_ref(), configuration.as_str()],
                Some(&env_vars),
                Some(&self.working_dir),
            )?
        } else {
            let build_script = build_script.to_string_lossy();
            let mut command = vec![
                "powershell",
                "-file",
                build_script.as_ref(),
                "-RepoName",
                project,
                configuration.as_str(),
            ];
            if self.sdv {
                command.push("sdv");
            }
            build_env.run_wrapped(self.command_exec, &command, Some(&self.working_dir))?
        };
        Ok(status)
    }

    // `build.ps1` ships next to the executable, or in the working directory
    fn build_script(&self) -> PathBuf {
        self.env
            .current_exe_dir()
            .map(|dir| dir.join(BUILD_SCRIPT))
            .filter(|script| self.fs.exists(script))
            .unwrap_or_else(|| self.working_dir.join(BUILD_SCRIPT))
    }
}
