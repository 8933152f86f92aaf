// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for [simtest](https://crates.io/crates/simtest). For a higher-level
//! overview, see that documentation.
//!
//! The basic flow: a [`CatalogSet`](catalog::CatalogSet) is loaded from an
//! [`Installation`](installation::Installation), each entry becomes a
//! [`TestCase`](test_case::TestCase) whose lifecycle is run with settings taken from a
//! [profile](config::SimtestProfile), and the resulting records are persisted and later
//! assembled into a submission.

pub mod catalog;
pub mod checkpoint;
pub mod checksum;
pub mod config;
pub mod errors;
pub mod helpers;
pub mod installation;
pub mod log_summary;
pub mod outcome;
pub mod record;
pub mod reporter;
pub mod submission;
pub mod test_case;
mod test_command;
mod time;
