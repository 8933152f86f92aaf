// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A regression test driver for simulation codes.
//!
//! `simtest` builds and runs the test cases listed in each module's catalogue, verifies their
//! output and restart behavior, and persists a result record next to each test case. Persisted
//! records can later be assembled into a submission payload.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter};
