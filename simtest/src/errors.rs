// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, ErrorStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use simtest_metadata::{RecordValidationError, SimtestExitCode, TestModule};
use simtest_runner::errors::*;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that simtest knows how to report and map to an exit code.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 { path: std::path::PathBuf },
    #[error("installation error")]
    InstallationError {
        #[from]
        err: InstallationError,
    },
    #[error("installation not compiled")]
    InstallationNotCompiled { root: Utf8PathBuf },
    #[error("profile not found")]
    ProfileNotFound {
        #[from]
        err: ProfileNotFound,
    },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("catalog load error")]
    CatalogLoadError {
        #[from]
        err: CatalogLoadError,
    },
    #[error("test lookup error")]
    TestLookupError {
        #[from]
        err: TestLookupError,
    },
    #[error("test case aborted")]
    TestCaseAborted {
        module: TestModule,
        name: String,
        #[source]
        err: TestCaseSetupError,
    },
    #[error("record read error")]
    RecordReadError {
        #[from]
        err: RecordReadError,
    },
    #[error("record write error")]
    RecordWriteError {
        #[from]
        err: RecordWriteError,
    },
    #[error("record not found")]
    RecordNotFound { module: TestModule, name: String },
    #[error("submission build error")]
    SubmissionBuildError {
        #[source]
        err: RecordValidationError,
    },
    #[error("submission serialize error")]
    SubmissionSerializeError {
        #[source]
        err: serde_json::Error,
    },
    #[error("failed to write submission")]
    SubmissionWriteError {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("test run failed")]
    TestRunFailed,
    #[error("no tests run")]
    NoTestsRun,
    #[error("error writing to output")]
    WriteError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn test_case_aborted(
        module: TestModule,
        name: impl Into<String>,
        err: TestCaseSetupError,
    ) -> Self {
        Self::TestCaseAborted {
            module,
            name: name.into(),
            err,
        }
    }

    pub(crate) fn record_not_found(module: TestModule, name: impl Into<String>) -> Self {
        Self::RecordNotFound {
            module,
            name: name.into(),
        }
    }

    pub(crate) fn submission_write_error(path: impl Into<Utf8PathBuf>, err: std::io::Error) -> Self {
        Self::SubmissionWriteError {
            path: path.into(),
            err,
        }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ProfileNotFound { .. }
            | Self::ConfigParseError { .. }
            | Self::TestLookupError { .. } => SimtestExitCode::SETUP_ERROR,
            Self::InstallationError { .. } | Self::InstallationNotCompiled { .. } => {
                SimtestExitCode::INSTALLATION_NOT_READY
            }
            Self::CatalogLoadError { .. } => SimtestExitCode::CATALOG_LOAD_FAILED,
            Self::TestCaseAborted { .. } => SimtestExitCode::TEST_CASE_ABORTED,
            Self::RecordReadError { .. }
            | Self::RecordWriteError { .. }
            | Self::RecordNotFound { .. }
            | Self::SubmissionBuildError { .. } => SimtestExitCode::RECORD_IO_FAILED,
            Self::TestRunFailed => SimtestExitCode::TEST_RUN_FAILED,
            Self::NoTestsRun => SimtestExitCode::NO_TESTS_RUN,
            Self::SubmissionSerializeError { .. }
            | Self::SubmissionWriteError { .. }
            | Self::WriteError { .. } => SimtestExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &ErrorStyles) {
        let mut next_error = match &self {
            Self::CurrentDirFailed { err } => {
                error!("could not determine current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { path } => {
                error!(
                    "current directory `{}` is not valid UTF-8",
                    path.display().style(styles.emphasis)
                );
                None
            }
            Self::InstallationError { err } => {
                error!("{err}");
                err.source()
            }
            Self::InstallationNotCompiled { root } => {
                error!(
                    "installation at `{}` has not been compiled",
                    root.style(styles.emphasis)
                );
                error!(
                    target: NO_HEADING_TARGET,
                    "{}",
                    "(hint: `lib` must be populated and every module's test_suite must exist)"
                        .style(styles.hint)
                );
                None
            }
            Self::ProfileNotFound { err } => {
                error!("{err}");
                err.source()
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse simtest config at `{}`",
                    err.config_file().style(styles.emphasis)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::CatalogLoadError { err } => {
                error!("{err}");
                err.source()
            }
            Self::TestLookupError { err } => {
                error!("{err}");
                None
            }
            Self::TestCaseAborted { module, name, err } => {
                error!(
                    "test case `{}` in module `{module}` aborted before an outcome was determined",
                    name.style(styles.emphasis)
                );
                Some(err as &dyn Error)
            }
            Self::RecordReadError { err } => {
                error!(
                    "failed to read result record at `{}`",
                    err.path().style(styles.emphasis)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::RecordWriteError { err } => {
                error!("{err}");
                err.source()
            }
            Self::RecordNotFound { module, name } => {
                error!(
                    "no result record for `{}` in module `{module}`",
                    name.style(styles.emphasis)
                );
                error!(
                    target: NO_HEADING_TARGET,
                    "{}",
                    "(hint: run the test case first with `simtest run`)".style(styles.hint)
                );
                None
            }
            Self::SubmissionBuildError { err } => {
                error!("failed to assemble submission");
                Some(err as &dyn Error)
            }
            Self::SubmissionSerializeError { err } => {
                error!("failed to serialize submission");
                Some(err as &dyn Error)
            }
            Self::SubmissionWriteError { path, err } => {
                error!("failed to write submission to `{}`", path.style(styles.emphasis));
                Some(err as &dyn Error)
            }
            Self::TestRunFailed => {
                error!("test run failed");
                None
            }
            Self::NoTestsRun => {
                error!("no tests to run");
                None
            }
            Self::WriteError { err } => {
                error!("failed to write to output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(
            ExpectedError::TestRunFailed.process_exit_code(),
            SimtestExitCode::TEST_RUN_FAILED
        );
        assert_eq!(
            ExpectedError::NoTestsRun.process_exit_code(),
            SimtestExitCode::NO_TESTS_RUN
        );
        assert_eq!(
            ExpectedError::from(InstallationError::RootNotSpecified {
                env_var: "SIM_DIR".to_owned(),
            })
            .process_exit_code(),
            SimtestExitCode::INSTALLATION_NOT_READY
        );
        assert_eq!(
            ExpectedError::record_not_found(TestModule::Star, "wd_cool").process_exit_code(),
            SimtestExitCode::RECORD_IO_FAILED
        );
        let aborted = ExpectedError::test_case_aborted(
            TestModule::Binary,
            "evolve_both_stars",
            TestCaseSetupError::WorkDirMissing {
                name: "evolve_both_stars".to_owned(),
                work_dir: "binary/test_suite/evolve_both_stars".into(),
            },
        );
        assert_eq!(
            aborted.process_exit_code(),
            SimtestExitCode::TEST_CASE_ABORTED
        );
    }
}
