// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{RecordValidationError, TestModule};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The externally observable outcome of a test case.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TestOutcomeSummary {
    /// The test case has not been run, or its result was never recorded.
    #[default]
    NotTested,
    /// The test case passed.
    Pass,
    /// The test case failed.
    Fail,
}

impl fmt::Display for TestOutcomeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotTested => f.write_str("not tested"),
            Self::Pass => f.write_str("pass"),
            Self::Fail => f.write_str("fail"),
        }
    }
}

/// The way in which a passing test case was verified.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessType {
    /// The run printed its success string, and the final model (if any) was produced. No restart
    /// was requested.
    RunTestString,
    /// The run was restarted from a photo and the regenerated final model matched.
    PhotoChecksum,
}

/// The reason a test case failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    /// The build step exited with a non-zero status.
    Compilation,
    /// The run output did not contain the success string.
    RunTestString,
    /// The final model was not produced by the run.
    FinalModelMissing,
    /// The photo to restart from could not be found.
    PhotoFileMissing,
    /// The checksum of the regenerated final model could not be computed.
    PhotoChecksum,
    /// The regenerated final model differs from the one produced by the run.
    PhotoDiff,
}

impl FailureType {
    /// Returns true if this failure happened during the restart phase.
    pub fn is_restart_failure(self) -> bool {
        matches!(
            self,
            Self::PhotoFileMissing | Self::PhotoChecksum | Self::PhotoDiff
        )
    }
}

/// The persisted and submitted result of a single test case.
///
/// Optional fields are `None` when the lifecycle never reached the point where they would be
/// measured.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestCaseRecord {
    /// The name of the test case, unique within its module.
    pub name: String,

    /// The module the test case belongs to.
    pub module: TestModule,

    /// The outcome.
    #[serde(default)]
    pub outcome: TestOutcomeSummary,

    /// Set if and only if `outcome` is [`TestOutcomeSummary::Pass`].
    #[serde(default)]
    pub success_type: Option<SuccessType>,

    /// Set if and only if `outcome` is [`TestOutcomeSummary::Fail`].
    #[serde(default)]
    pub failure_type: Option<FailureType>,

    /// A human-readable description of the failure, if any.
    #[serde(default)]
    pub failure_message: Option<String>,

    /// When the lifecycle started.
    #[serde(default)]
    pub started_at: Option<DateTime<FixedOffset>>,

    /// Wall-clock duration of the run step, in seconds.
    #[serde(default)]
    pub build_runtime_seconds: Option<f64>,

    /// Wall-clock duration of the restart step, in seconds.
    #[serde(default)]
    pub restart_runtime_seconds: Option<f64>,

    /// Wall-clock duration from the start of the build to the end of the last verification.
    #[serde(default)]
    pub total_runtime_seconds: Option<f64>,

    /// The number of threads the external programs were allowed to use.
    #[serde(default)]
    pub thread_count: Option<u32>,

    /// Content checksum of the final model. Only present for passing test cases that checked one.
    #[serde(default)]
    pub checksum: Option<String>,

    /// Steps taken by the run phase, summed over its summary lines.
    #[serde(default)]
    pub step_count: Option<u64>,

    /// Retries taken by the run phase.
    #[serde(default)]
    pub retry_count: Option<u64>,

    /// Backups taken by the run phase.
    #[serde(default)]
    pub backup_count: Option<u64>,

    /// Runtime reported by the run phase's summary lines, in minutes.
    #[serde(default)]
    pub runtime_minutes: Option<f64>,

    /// The raw summary lines attributed to the run phase.
    #[serde(default)]
    pub summary_text: Option<String>,

    /// The compiler the installation was built with, if known.
    #[serde(default)]
    pub compiler: Option<String>,
}

impl TestCaseRecord {
    /// Creates a record for a test case that hasn't been run yet.
    pub fn not_tested(name: impl Into<String>, module: TestModule) -> Self {
        Self {
            name: name.into(),
            module,
            outcome: TestOutcomeSummary::NotTested,
            success_type: None,
            failure_type: None,
            failure_message: None,
            started_at: None,
            build_runtime_seconds: None,
            restart_runtime_seconds: None,
            total_runtime_seconds: None,
            thread_count: None,
            checksum: None,
            step_count: None,
            retry_count: None,
            backup_count: None,
            runtime_minutes: None,
            summary_text: None,
            compiler: None,
        }
    }

    /// Checks that the classification fields agree with the outcome, and that a checksum is only
    /// present on passing records.
    pub fn validate(&self) -> Result<(), RecordValidationError> {
        let has_success_type = self.success_type.is_some();
        let has_failure_type = self.failure_type.is_some();
        let consistent = match self.outcome {
            TestOutcomeSummary::NotTested => !has_success_type && !has_failure_type,
            TestOutcomeSummary::Pass => has_success_type && !has_failure_type,
            TestOutcomeSummary::Fail => !has_success_type && has_failure_type,
        };
        if !consistent {
            return Err(RecordValidationError::ClassificationMismatch {
                name: self.name.clone(),
                outcome: self.outcome,
                has_success_type,
                has_failure_type,
            });
        }

        if self.checksum.is_some() && self.outcome != TestOutcomeSummary::Pass {
            return Err(RecordValidationError::UnexpectedChecksum {
                name: self.name.clone(),
                outcome: self.outcome,
            });
        }

        Ok(())
    }
}

/// The aggregate payload for a whole run, as handed to the result transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunSubmission {
    /// The revision (or commit SHA) of the installation that was tested.
    pub revision: String,

    /// Whether the installation was compiled successfully.
    pub install_success: bool,

    /// The default compiler identity for the run.
    pub compiler: Option<String>,

    /// Per-test records, in the order they were run.
    pub test_cases: Vec<TestCaseRecord>,
}

impl RunSubmission {
    /// Assembles a submission, validating every record.
    ///
    /// Records without a compiler identity inherit `default_compiler`.
    pub fn new(
        revision: impl Into<String>,
        install_success: bool,
        default_compiler: Option<String>,
        records: impl IntoIterator<Item = TestCaseRecord>,
    ) -> Result<Self, RecordValidationError> {
        let test_cases = records
            .into_iter()
            .map(|mut record| {
                record.validate()?;
                if record.compiler.is_none() {
                    record.compiler.clone_from(&default_compiler);
                }
                Ok(record)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            revision: revision.into(),
            install_success,
            compiler: default_compiler,
            test_cases,
        })
    }

    /// Returns the number of passing and failing records.
    pub fn counts(&self) -> (usize, usize) {
        self.test_cases
            .iter()
            .fold((0, 0), |(pass, fail), record| match record.outcome {
                TestOutcomeSummary::Pass => (pass + 1, fail),
                TestOutcomeSummary::Fail => (pass, fail + 1),
                TestOutcomeSummary::NotTested => (pass, fail),
            })
    }

    /// Serializes this submission as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
