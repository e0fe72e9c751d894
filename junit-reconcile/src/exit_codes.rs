// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `junit-reconcile` failures.
///
/// Once the test framework has run, `junit-reconcile` exits with the framework's own exit code.
/// The codes below are used for failures that happen before the framework runs, or that prevent
/// the final report from being written.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum ReconcileExitCode {}

impl ReconcileExitCode {
    /// The framework ran and passed.
    pub const OK: i32 = 0;

    /// No test files were provided.
    pub const NO_TEST_FILES: i32 = 1;

    /// One or more of the provided test files does not exist.
    pub const INVALID_TEST_FILE: i32 = 2;

    /// A user issue happened while setting up the invocation, for example the reports directory
    /// could not be created.
    pub const SETUP_ERROR: i32 = 96;

    /// Serializing or writing the final report produced an error.
    pub const WRITE_REPORT_FAILED: i32 = 110;

    /// The test framework could not be executed at all.
    ///
    /// This matches the exit code a shell uses for a command that was not found. A report is
    /// still written in this case.
    pub const FRAMEWORK_EXEC_FAILED: i32 = 127;
}
