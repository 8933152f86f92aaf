// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classifying the outcome of a test case.
//!
//! The lifecycle records each check it performs as a [`VerificationStep`]. [`classify`] maps the
//! recorded steps to exactly one terminal outcome.

use simtest_metadata::{FailureType, SuccessType, TestOutcomeSummary};
use std::fmt;

/// The outcome of a test case.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TestOutcome {
    /// The test case hasn't been run.
    #[default]
    NotTested,

    /// The test case passed.
    Pass(SuccessType),

    /// The test case failed.
    Fail(FailureType),
}

impl TestOutcome {
    /// Returns the outcome without its reason.
    pub fn summary(self) -> TestOutcomeSummary {
        match self {
            TestOutcome::NotTested => TestOutcomeSummary::NotTested,
            TestOutcome::Pass(_) => TestOutcomeSummary::Pass,
            TestOutcome::Fail(_) => TestOutcomeSummary::Fail,
        }
    }

    /// Returns the success type if the test case passed.
    pub fn success_type(self) -> Option<SuccessType> {
        match self {
            TestOutcome::Pass(success_type) => Some(success_type),
            _ => None,
        }
    }

    /// Returns the failure type if the test case failed.
    pub fn failure_type(self) -> Option<FailureType> {
        match self {
            TestOutcome::Fail(failure_type) => Some(failure_type),
            _ => None,
        }
    }

    /// Returns true if the test case passed.
    pub fn is_pass(self) -> bool {
        matches!(self, TestOutcome::Pass(_))
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.summary().fmt(f)
    }
}

/// How the checksum of the regenerated final model compared to the run's.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChecksumComparison {
    /// The checksums are identical.
    Match,

    /// The checksums differ.
    Mismatch,

    /// The regenerated final model couldn't be checksummed.
    Unavailable,
}

/// A single check performed during a test case's lifecycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VerificationStep {
    /// The build step completed.
    Build {
        /// Whether it exited successfully.
        succeeded: bool,
    },

    /// The run output was searched for the success string.
    RunOutput {
        /// Whether the success string was found.
        found: bool,
    },

    /// The run was checked for its final model.
    FinalModel {
        /// Whether the final model exists.
        present: bool,
    },

    /// The photo to restart from was looked up.
    Photo {
        /// Whether the photo exists.
        found: bool,
    },

    /// The regenerated final model was compared to the run's.
    RestartChecksum(ChecksumComparison),
}

impl VerificationStep {
    fn failure(self) -> Option<FailureType> {
        match self {
            VerificationStep::Build { succeeded: false } => Some(FailureType::Compilation),
            VerificationStep::RunOutput { found: false } => Some(FailureType::RunTestString),
            VerificationStep::FinalModel { present: false } => {
                Some(FailureType::FinalModelMissing)
            }
            VerificationStep::Photo { found: false } => Some(FailureType::PhotoFileMissing),
            VerificationStep::RestartChecksum(ChecksumComparison::Mismatch) => {
                Some(FailureType::PhotoDiff)
            }
            VerificationStep::RestartChecksum(ChecksumComparison::Unavailable) => {
                Some(FailureType::PhotoChecksum)
            }
            _ => None,
        }
    }
}

/// Maps a sequence of verification steps to a terminal outcome.
///
/// The first failing step decides the failure type. A sequence with no failing step passes, with
/// [`SuccessType::PhotoChecksum`] if a restart was verified and [`SuccessType::RunTestString`]
/// otherwise. Sequences that stop short of a verified run are failures: no successful build
/// classifies as [`FailureType::Compilation`], no verified run output as
/// [`FailureType::RunTestString`], and a photo with no checksum comparison as
/// [`FailureType::PhotoChecksum`].
pub fn classify(steps: &[VerificationStep]) -> TestOutcome {
    if let Some(failure) = steps.iter().find_map(|step| step.failure()) {
        return TestOutcome::Fail(failure);
    }

    let has = |wanted: VerificationStep| steps.contains(&wanted);
    if !has(VerificationStep::Build { succeeded: true }) {
        return TestOutcome::Fail(FailureType::Compilation);
    }
    if !has(VerificationStep::RunOutput { found: true }) {
        return TestOutcome::Fail(FailureType::RunTestString);
    }

    let restarted = has(VerificationStep::RestartChecksum(ChecksumComparison::Match));
    if restarted {
        TestOutcome::Pass(SuccessType::PhotoChecksum)
    } else if has(VerificationStep::Photo { found: true }) {
        TestOutcome::Fail(FailureType::PhotoChecksum)
    } else {
        TestOutcome::Pass(SuccessType::RunTestString)
    }
}

/// Returns a human-readable description of a failure.
pub fn failure_message(
    test_name: &str,
    final_model: Option<&str>,
    failure_type: FailureType,
) -> String {
    let final_model = final_model.unwrap_or("final model");
    match failure_type {
        FailureType::Compilation => format!("`{test_name}` failed to compile"),
        FailureType::RunTestString => {
            format!("`{test_name}` run failed: success string not found in output")
        }
        FailureType::FinalModelMissing => {
            format!("`{test_name}` run failed: `{final_model}` was not produced")
        }
        FailureType::PhotoFileMissing => {
            format!("`{test_name}` restart failed: photo to restart from not found")
        }
        FailureType::PhotoChecksum => format!(
            "`{test_name}` restart failed: could not compute checksum for `{final_model}` after \
             restart"
        ),
        FailureType::PhotoDiff => format!(
            "`{test_name}` restart failed: checksum for `{final_model}` does not match after restart"
        ),
    }
}
