// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembling the aggregate payload for a run.

use crate::{
    catalog::TestSpec, errors::RecordReadError, installation::InstallationInfo,
    record::read_record, test_case::TestCase,
};
use simtest_metadata::{RecordValidationError, RunSubmission, TestCaseRecord, TestModule};
use tracing::debug;

/// Collects per-test records into a [`RunSubmission`].
#[derive(Debug)]
pub struct SubmissionBuilder<'a> {
    installation: debug_ignore::DebugIgnore<&'a dyn InstallationInfo>,
    compiler: Option<String>,
    records: Vec<TestCaseRecord>,
}

impl<'a> SubmissionBuilder<'a> {
    /// Creates a builder for a run against `installation`.
    ///
    /// Records without a compiler identity are given `compiler`.
    pub fn new(installation: &'a dyn InstallationInfo, compiler: Option<String>) -> Self {
        Self {
            installation: debug_ignore::DebugIgnore(installation),
            compiler,
            records: Vec::new(),
        }
    }

    /// Adds the state of a test case that ran in this process.
    pub fn add_test_case(&mut self, test_case: &TestCase<'_>) -> &mut Self {
        self.records.push(test_case.to_record());
        self
    }

    /// Adds the persisted record of a test case, or a not-tested record if it has none.
    pub fn add_persisted(
        &mut self,
        module: TestModule,
        spec: &TestSpec,
    ) -> Result<&mut Self, RecordReadError> {
        let work_dir = self.installation.test_suite_path(module).join(&spec.name);
        let record = match read_record(&work_dir)? {
            Some(record) => record,
            None => {
                debug!("no result record for `{}` in {work_dir}", spec.name);
                TestCaseRecord::not_tested(&spec.name, module)
            }
        };
        self.records.push(record);
        Ok(self)
    }

    /// Returns the number of records added so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records have been added.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Builds the submission.
    pub fn build(self) -> Result<RunSubmission, RecordValidationError> {
        RunSubmission::new(
            self.installation.revision(),
            self.installation.is_installed(),
            self.compiler,
            self.records,
        )
    }
}
