// Copyright (c) Microsoft Corporation
// License: MIT OR Apache-2.0
//! Thin wrappers around the process environment, the file system, subprocess
//! execution and the certificate store. These are the only places that touch
//! ambient process state, so the action layer can be unit tested with mocks.

pub mod cert_store;
pub mod env;
pub mod error;
pub mod exec;
pub mod fs;
