// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Machine-readable result types for [simtest](https://crates.io/crates/simtest).
//!
//! simtest runs the regression catalogue of a scientific simulation code and
//! produces one [`TestCaseRecord`] per test case. Records are persisted next to
//! each test case's working directory and later bundled into a
//! [`RunSubmission`] for transport to a result hub.

mod errors;
mod exit_codes;
mod module;
mod records;

pub use errors::*;
pub use exit_codes::*;
pub use module::*;
pub use records::*;
