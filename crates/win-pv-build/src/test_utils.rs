use std::process::ExitStatus;

/// Builds an `ExitStatus` carrying `code`, for mocked command results.
#[cfg(windows)]
pub fn exit_status(code: u32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code)
}

/// Builds an `ExitStatus` carrying `code`, for mocked command results.
#[cfg(unix)]
pub fn exit_status(code: u32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    // wait(2) status layout: exit code in the second byte
    ExitStatus::from_raw((code as i32) << 8)
}
