// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by simtest.
//!
//! Only conditions that prevent an outcome from being determined are represented here. A test case
//! that runs and fails is not an error: see [`TestOutcome`](crate::outcome::TestOutcome).

use camino::Utf8PathBuf;
use config::ConfigError;
use simtest_metadata::{ModuleSelector, RecordValidationError, TestModule};
use std::fmt;
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse simtest config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// The default profile named in the config doesn't exist.
    #[error("default profile `{default_profile}` not found (known profiles: {})", .all_profiles.join(", "))]
    DefaultProfileNotFound {
        /// The default profile.
        default_profile: String,

        /// All known profiles.
        all_profiles: Vec<String>,
    },
}

/// An error which indicates that a profile was requested but not known to simtest.
#[derive(Clone, Debug, Error)]
#[error("profile `{profile}` not found (known profiles: {})", .all_profiles.join(", "))]
pub struct ProfileNotFound {
    profile: String,
    all_profiles: Vec<String>,
}

impl ProfileNotFound {
    pub(crate) fn new(
        profile: impl Into<String>,
        all_profiles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut all_profiles: Vec<_> = all_profiles.into_iter().map(|s| s.into()).collect();
        all_profiles.sort_unstable();
        Self {
            profile: profile.into(),
            all_profiles,
        }
    }
}

/// Error returned while parsing a [`CheckpointPolicy`](crate::catalog::CheckpointPolicy) from a
/// string.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error(
    "unrecognized checkpoint `{input}` (expected `skip`, `auto`, a number, or `x` followed by a \
     number)"
)]
pub struct CheckpointPolicyParseError {
    input: String,
}

impl CheckpointPolicyParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error that occurred while loading a module's test catalogue.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    /// The catalogue source file doesn't exist.
    #[error("test catalogue for module `{module}` not found at `{path}`")]
    NotFound {
        /// The module whose catalogue was requested.
        module: TestModule,

        /// The path that was looked up.
        path: Utf8PathBuf,
    },

    /// The catalogue source file exists but couldn't be read.
    #[error("failed to read test catalogue for module `{module}` at `{path}`")]
    Read {
        /// The module whose catalogue was requested.
        module: TestModule,

        /// The path that failed to be read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },
}

impl CatalogLoadError {
    /// Returns the module this error is for.
    pub fn module(&self) -> TestModule {
        match self {
            Self::NotFound { module, .. } | Self::Read { module, .. } => *module,
        }
    }
}

/// An error that occurred while looking up a test case by name or index.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TestLookupError {
    /// No test case with this name exists.
    #[error("no test case named `{name}` in {selector}")]
    NameNotFound {
        /// The name that was looked up.
        name: String,

        /// The modules that were searched.
        selector: SelectorDisplay,
    },

    /// The index is out of range.
    #[error("test case index {index} is out of range for {selector} (valid range: 1..={count})")]
    IndexOutOfRange {
        /// The 1-based index that was looked up.
        index: usize,

        /// The modules that were searched.
        selector: SelectorDisplay,

        /// The number of test cases available.
        count: usize,
    },
}

/// Displays a [`ModuleSelector`] in error messages.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SelectorDisplay(pub ModuleSelector);

impl fmt::Display for SelectorDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ModuleSelector::One(module) => write!(f, "module `{module}`"),
            ModuleSelector::All => write!(f, "all modules"),
        }
    }
}

/// An error that occurred while setting up an [`Installation`](crate::installation::Installation).
#[derive(Debug, Error)]
pub enum InstallationError {
    /// The installation root is not a directory.
    #[error("installation root `{root}` is not a directory")]
    RootMissing {
        /// The root that was provided.
        root: Utf8PathBuf,
    },

    /// The installation root was not provided and couldn't be determined.
    #[error("installation root not specified (pass --root or set `{env_var}`)")]
    RootNotSpecified {
        /// The environment variable that was consulted.
        env_var: String,
    },
}

/// An error that aborts a test case's lifecycle before an outcome can be determined.
///
/// These are never encoded as a failing outcome.
#[derive(Debug, Error)]
pub enum TestCaseSetupError {
    /// The test case's working directory doesn't exist.
    #[error("working directory for `{name}` not found at `{work_dir}`")]
    WorkDirMissing {
        /// The test case.
        name: String,

        /// The expected working directory.
        work_dir: Utf8PathBuf,
    },

    /// The clean program could not be executed.
    #[error("failed to execute clean for `{name}`")]
    CleanExecFailed {
        /// The test case.
        name: String,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// The clean program exited with a non-zero status.
    #[error("clean for `{name}` failed{}", exit_code_suffix(*.exit_code))]
    CleanFailed {
        /// The test case.
        name: String,

        /// The exit code, if the process wasn't terminated by a signal.
        exit_code: Option<i32>,
    },

    /// A derived artifact couldn't be removed while cleaning.
    #[error("failed to remove `{path}` while cleaning")]
    CleanRemoveFailed {
        /// The path that couldn't be removed.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// An external program could not be executed at all.
    #[error("failed to execute `{command}` in `{work_dir}`")]
    CommandExecFailed {
        /// The command line.
        command: String,

        /// The working directory.
        work_dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// The combined log couldn't be written.
    #[error("failed to write combined log at `{path}`")]
    LogWriteFailed {
        /// The log path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// Enumerating checkpoint directories failed for a reason other than absence.
    #[error("failed to read photo directory `{dir}`")]
    PhotoDirReadFailed {
        /// The directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },
}

fn exit_code_suffix(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!(" with exit code {code}"),
        None => " (terminated by signal)".to_owned(),
    }
}

/// An error that occurred while reading a persisted result record.
#[derive(Debug, Error)]
#[error("failed to read result record at `{path}`")]
pub struct RecordReadError {
    path: Utf8PathBuf,
    #[source]
    kind: RecordReadErrorKind,
}

impl RecordReadError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, kind: RecordReadErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Returns the path of the record.
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> &RecordReadErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while reading a result record.
#[derive(Debug, Error)]
pub enum RecordReadErrorKind {
    /// The file couldn't be read.
    #[error("error reading file")]
    Read(#[source] std::io::Error),

    /// The file isn't valid TOML for a record.
    #[error("error parsing record")]
    Parse(#[source] toml::de::Error),

    /// The record parsed but its fields contradict each other.
    #[error("record is inconsistent")]
    Invalid(#[source] RecordValidationError),
}

/// An error that occurred while writing a persisted result record.
#[derive(Debug, Error)]
pub enum RecordWriteError {
    /// The record couldn't be serialized.
    #[error("failed to serialize result record for `{path}`")]
    Serialize {
        /// The destination path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: toml::ser::Error,
    },

    /// The record couldn't be written.
    #[error("failed to write result record to `{path}`")]
    Write {
        /// The destination path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: atomicwrites::Error<std::io::Error>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_failed_message() {
        let err = TestCaseSetupError::CleanFailed {
            name: "1M_pre_ms".to_owned(),
            exit_code: Some(2),
        };
        assert_eq!(err.to_string(), "clean for `1M_pre_ms` failed with exit code 2");

        let err = TestCaseSetupError::CleanFailed {
            name: "1M_pre_ms".to_owned(),
            exit_code: None,
        };
        assert_eq!(
            err.to_string(),
            "clean for `1M_pre_ms` failed (terminated by signal)"
        );
    }

    #[test]
    fn lookup_messages_name_the_selector() {
        let err = TestLookupError::IndexOutOfRange {
            index: 9,
            selector: SelectorDisplay(ModuleSelector::All),
            count: 4,
        };
        assert_eq!(
            err.to_string(),
            "test case index 9 is out of range for all modules (valid range: 1..=4)"
        );
    }
}
