// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! This module contains the `FetchAction` struct, which clones every driver
//! repository and the installer repository next to each other. Driver
//! repositories are checked out at a branch derived from the branch of the
//! repository the tool runs from, so a feature branch named
//! `<prefix><repo-name>` fetches `<prefix><project>` everywhere.

pub mod error;

use std::path::{Path, PathBuf};

use error::{FailedClone, FetchActionError};
use mockall_double::double;
use tracing::{debug, error as err, info, warn};

use crate::{
    actions::{DEFAULT_BRANCH, INSTALLER_URL, PROJECT_URLS, url_to_simple_name},
    providers::error::CommandError,
};
#[double]
use crate::providers::{exec::CommandExec, fs::Fs};

/// Returns the part of `current_branch` before a trailing `repo_name`. No
/// prefix is derived when the branch does not end with the repository name,
/// or when nothing precedes it.
#[must_use]
pub fn derive_branch_prefix<'b>(current_branch: &'b str, repo_name: &str) -> Option<&'b str> {
    current_branch
        .strip_suffix(repo_name)
        .filter(|prefix| !prefix.is_empty())
}

/// Branch to clone `project` at
#[must_use]
pub fn branch_for(prefix: Option<&str>, project: &str) -> String {
    prefix.map_or_else(
        || DEFAULT_BRANCH.to_string(),
        |prefix| format!("{prefix}{project}"),
    )
}

/// Action that clones the sibling repositories
pub struct FetchAction<'a> {
    working_dir: PathBuf,

    // Injected deps
    command_exec: &'a CommandExec,
    fs: &'a Fs,
}

impl<'a> FetchAction<'a> {
    pub fn new(working_dir: &Path, command_exec: &'a CommandExec, fs: &'a Fs) -> Self {
        Self {
            working_dir: working_dir.to_path_buf(),
            command_exec,
            fs,
        }
    }

    /// Entry point method to execute the fetch action flow.
    ///
    /// # Errors
    /// * `FetchActionError::GitQuery` - If the current branch or the `origin`
    ///   remote could not be determined
    /// * `FetchActionError::CloneFailed` - If one or more `git clone` runs
    ///   exited with a non-zero status. Every repository is still attempted
    /// * `FetchActionError::CommandExecution` - If `git` could not be launched
    pub fn run(&self) -> Result<(), FetchActionError> {
        let current_branch = self.git_query(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let origin_url = self.git_query(&["remote", "get-url", "origin"])?;
        let repo_name = url_to_simple_name(&origin_url);
        let prefix = derive_branch_prefix(&current_branch, repo_name);
        match prefix {
            Some(prefix) => info!("Fetching branches prefixed with '{prefix}'"),
            None => info!(
                "Branch '{current_branch}' does not end with '{repo_name}', fetching \
                 {DEFAULT_BRANCH}"
            ),
        }

        let mut failed = Vec::new();
        let repos = PROJECT_URLS
            .iter()
            .map(|url| (*url, branch_for(prefix, url_to_simple_name(url))))
            .chain([(INSTALLER_URL, DEFAULT_BRANCH.to_string())]);
        for (url, branch) in repos {
            if let Some(failure) = self.clone_repo(url, &branch)? {
                err!("Cloning {failure} failed");
                failed.push(failure);
            }
        }
        if !failed.is_empty() {
            return Err(FetchActionError::CloneFailed(failed));
        }

        info!("Fetched all repositories into {}", self.working_dir.display());
        Ok(())
    }

    fn git_query(&self, args: &[&str]) -> Result<String, FetchActionError> {
        let output = self
            .command_exec
            .output("git", args, None, Some(&self.working_dir))
            .map_err(FetchActionError::GitQuery)?;
        if !output.status.success() {
            return Err(FetchActionError::GitQuery(CommandError::from_output(
                "git", args, &output,
            )));
        }
        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("git {args:?} returned {value}");
        Ok(value)
    }

    fn clone_repo(&self, url: &str, branch: &str) -> Result<Option<FailedClone>, CommandError> {
        let repo_dir = self.working_dir.join(url_to_simple_name(url));
        if self.fs.exists(&repo_dir) {
            warn!(
                "{} already exists, skipping clone of {url}",
                repo_dir.display()
            );
            return Ok(None);
        }

        let status = self.command_exec.run(
            "git",
            &["clone", "-b", branch, url],
            None,
            Some(&self.working_dir),
        )?;
        if status.success() {
            return Ok(None);
        }
        Ok(Some(FailedClone {
            url: url.to_string(),
            branch: branch.to_string(),
            status,
        }))
    }
}
