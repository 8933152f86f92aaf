// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for simtest.
//!
//! Configuration is read from an embedded default layered under an optional repository file,
//! `.config/simtest.toml`. Settings are grouped into profiles. A profile other than `default`
//! inherits every setting it doesn't specify from `default`.

mod imp;
mod profile;

pub use imp::*;
pub use profile::*;
