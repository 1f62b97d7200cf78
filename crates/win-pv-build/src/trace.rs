// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! This module configures logging. The level comes from `--loglevel` when it
//! is given, otherwise from clap's verbosity flags.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

/// Maps the command line options to a log level filter.
pub fn level_filter(
    loglevel: Option<LogLevel>,
    verbosity_level: clap_verbosity_flag::Verbosity,
) -> LevelFilter {
    if let Some(loglevel) = loglevel {
        return match loglevel {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Error => LevelFilter::ERROR,
        };
    }

    // Change default log level to
    // * INFO if no verbosity level is set
    // * Debug level when -v is set
    // * Trace level when -vv is set
    match verbosity_level.filter() {
        clap_verbosity_flag::VerbosityFilter::Off => LevelFilter::OFF,
        clap_verbosity_flag::VerbosityFilter::Error => LevelFilter::INFO,
        clap_verbosity_flag::VerbosityFilter::Warn => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Initializes the tracing subscriber.
pub fn init_tracing(loglevel: Option<LogLevel>, verbosity_level: clap_verbosity_flag::Verbosity) {
    let tracing_filter =
        EnvFilter::default().add_directive(level_filter(loglevel, verbosity_level).into());

    tracing_subscriber::fmt()
        .compact()
        .without_time()
        .with_target(false)
        .with_file(false)
        .with_env_filter(tracing_filter)
        .init();
}
