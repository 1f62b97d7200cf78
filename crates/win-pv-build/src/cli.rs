// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! This module defines the top-level CLI layer, its argument types and the
//! wiring of the real providers into the actions.

use anyhow::{Ok, Result, bail};
use chrono::{DateTime, Local};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::Verbosity;
use mockall_double::double;
use tracing::info;

use crate::{
    actions::{
        BuildConfiguration,
        build::{BuildAction, BuildActionParams},
        env::EnvProbe,
        fetch::FetchAction,
        installer::{
            InstallerAction,
            InstallerActionParams,
            identity::{Branding, CertificateIdentity},
        },
    },
    providers::cert_store::WindowsCertStore,
};
#[double]
use crate::providers::{env::Env, exec::CommandExec, fs::Fs};

const ABOUT_STRING: &str = "The Windows PV drivers builder.";

/// Log level accepted by `--loglevel`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

/// Arguments for the `build` subcommand
#[derive(Debug, Args)]
pub struct BuildArgs {
    /// The projects to build. All driver projects when omitted
    #[arg()]
    pub projects: Vec<String>,

    /// Build projects with debug config
    #[arg(short, long)]
    pub debug: bool,

    /// Run SDV analysis
    #[arg(long)]
    pub sdv: bool,
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub enum Subcmd {
    #[clap(name = "fetch", about = "Fetch all source repos.")]
    Fetch,
    #[clap(name = "build", about = "Build all source repos.")]
    Build(BuildArgs),
}

/// Top level command line interface for win-pv-build
#[derive(Debug, Parser)]
#[clap(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = ABOUT_STRING,
)]
pub struct Cli {
    /// Log level, overrides -v/-q
    #[arg(long, global = true, ignore_case = true)]
    pub loglevel: Option<LogLevel>,
    #[clap(subcommand)]
    pub sub_cmd: Option<Subcmd>,
    #[command(flatten)]
    #[clap(next_help_heading = "Verbosity")]
    pub verbose: Verbosity,
}

impl Cli {
    /// Entry point method to construct and call actions based on the subcommand
    /// and arguments provided by the user. `started_at` stamps the test
    /// certificate name.
    pub fn run(self, started_at: DateTime<Local>) -> Result<()> {
        let env = Env::default();
        let command_exec = CommandExec::default();
        let fs = Fs::default();
        let working_dir = env.current_dir()?;

        let Some(sub_cmd) = self.sub_cmd else {
            bail!("No subcommand given. Use fetch or build");
        };

        match sub_cmd {
            Subcmd::Fetch => {
                FetchAction::new(&working_dir, &command_exec, &fs).run()?;
                Ok(())
            }
            Subcmd::Build(cli_args) => {
                let configuration = BuildConfiguration::from_debug(cli_args.debug);
                let build_action = BuildAction::new(
                    &BuildActionParams {
                        working_dir: &working_dir,
                        projects: &cli_args.projects,
                        configuration,
                        sdv: cli_args.sdv,
                    },
                    &env,
                    &command_exec,
                    &fs,
                )?;
                let build_env = EnvProbe::new(&env, &fs, &command_exec).probe()?;
                build_action.run(&build_env)?;

                if build_action.installer_requested() {
                    let branding = Branding::load(&fs, &working_dir)?;
                    let identity = CertificateIdentity::new(&branding, &started_at);
                    let cert_store = WindowsCertStore::new(&build_env.kit_root, &command_exec);
                    let report = InstallerAction::new(
                        &InstallerActionParams {
                            working_dir: &working_dir,
                            configuration,
                            identity: &identity,
                        },
                        &build_env,
                        &command_exec,
                        &fs,
                        &cert_store,
                    )
                    .run()?;
                    info!("Installer bundle: {}", report.archive.display());
                }
                Ok(())
            }
        }
    }
}
