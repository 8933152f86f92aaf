// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{TestModule, TestOutcomeSummary};
use std::{error, fmt};

/// An error returned while parsing a [`TestModule`] or
/// [`ModuleSelector`](crate::ModuleSelector) from a string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownModuleError {
    input: String,
}

impl UnknownModuleError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// Returns the input that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for UnknownModuleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "unknown module `{}` (known modules: {}, all)",
            self.input,
            TestModule::variants().join(", ")
        )
    }
}

impl error::Error for UnknownModuleError {}

/// A [`TestCaseRecord`](crate::TestCaseRecord) whose fields contradict each other.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordValidationError {
    /// The outcome and the success/failure type fields disagree.
    ClassificationMismatch {
        /// The test case the record belongs to.
        name: String,

        /// The recorded outcome.
        outcome: TestOutcomeSummary,

        /// Whether a success type was present.
        has_success_type: bool,

        /// Whether a failure type was present.
        has_failure_type: bool,
    },

    /// A checksum was recorded for a test case that did not pass.
    UnexpectedChecksum {
        /// The test case the record belongs to.
        name: String,

        /// The recorded outcome.
        outcome: TestOutcomeSummary,
    },
}

impl fmt::Display for RecordValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ClassificationMismatch {
                name,
                outcome,
                has_success_type,
                has_failure_type,
            } => {
                let present = |b: bool| if b { "present" } else { "absent" };
                write!(
                    f,
                    "record for `{name}` has outcome `{outcome}` but success type is {} \
                     and failure type is {}",
                    present(*has_success_type),
                    present(*has_failure_type),
                )
            }
            Self::UnexpectedChecksum { name, outcome } => {
                write!(
                    f,
                    "record for `{name}` has outcome `{outcome}` but carries a checksum"
                )
            }
        }
    }
}

impl error::Error for RecordValidationError {}
