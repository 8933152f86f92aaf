// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `simtest` failures.
///
/// `simtest` runs may fail for a variety of reasons. This structure documents the exit codes that
/// may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum SimtestExitCode {}

impl SimtestExitCode {
    /// No errors occurred and simtest exited normally.
    pub const OK: i32 = 0;

    /// No test cases were selected to run, but no other errors occurred.
    pub const NO_TESTS_RUN: i32 = 4;

    /// One or more test cases finished with a failing outcome.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// The installation is missing or hasn't been compiled.
    pub const INSTALLATION_NOT_READY: i32 = 102;

    /// Loading a module's test catalogue produced an error.
    pub const CATALOG_LOAD_FAILED: i32 = 104;

    /// A test case's lifecycle was aborted before an outcome could be determined, for example
    /// because its working directory was missing or the clean step failed.
    pub const TEST_CASE_ABORTED: i32 = 105;

    /// Reading or writing a persisted result record failed.
    pub const RECORD_IO_FAILED: i32 = 106;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;

    /// A user issue happened while setting up a simtest invocation.
    pub const SETUP_ERROR: i32 = 96;
}
