// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `delegate-test` failures.
///
/// `delegate-test` runs may fail for a variety of reasons. This structure documents the exit codes
/// that may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum DelegateExitCode {}

impl DelegateExitCode {
    /// No errors occurred and every delegated test passed or was ignored.
    pub const OK: i32 = 0;

    /// A user issue happened before the delegation started, for example an invalid class name or
    /// a config file that failed to parse.
    pub const SETUP_ERROR: i32 = 96;

    /// One or more tests failed, or the delegation itself failed.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// Writing a report produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;

    /// The run was stopped by the user before it completed.
    pub const STOPPED_BY_USER: i32 = 130;
}
