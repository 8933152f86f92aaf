// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::UnknownModuleError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A subsystem of the simulation code under which test suites are grouped.
///
/// The set of modules is closed. The order of [`TestModule::ALL`] is significant: it is the order
/// used when test cases are addressed by a cumulative index across all modules.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestModule {
    /// Single-star evolution.
    Star,
    /// Binary systems.
    Binary,
    /// Asteroseismology.
    Astero,
}

impl TestModule {
    /// All modules, in addressing order.
    pub const ALL: [TestModule; 3] = [TestModule::Star, TestModule::Binary, TestModule::Astero];

    /// Returns the directory name of this module within an installation.
    pub fn as_str(self) -> &'static str {
        match self {
            TestModule::Star => "star",
            TestModule::Binary => "binary",
            TestModule::Astero => "astero",
        }
    }

    /// Returns the string values accepted by [`FromStr`].
    pub fn variants() -> [&'static str; 3] {
        Self::ALL.map(|module| module.as_str())
    }
}

impl fmt::Display for TestModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestModule {
    type Err = UnknownModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|module| module.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownModuleError::new(s))
    }
}

/// Either a single module or all of them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ModuleSelector {
    /// A single module.
    One(TestModule),
    /// Every module, in [`TestModule::ALL`] order.
    #[default]
    All,
}

impl ModuleSelector {
    /// Returns the modules this selector covers, in addressing order.
    pub fn modules(self) -> &'static [TestModule] {
        match self {
            ModuleSelector::One(TestModule::Star) => &[TestModule::Star],
            ModuleSelector::One(TestModule::Binary) => &[TestModule::Binary],
            ModuleSelector::One(TestModule::Astero) => &[TestModule::Astero],
            ModuleSelector::All => &TestModule::ALL,
        }
    }
}

impl fmt::Display for ModuleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleSelector::One(module) => module.fmt(f),
            ModuleSelector::All => f.write_str("all"),
        }
    }
}

impl FromStr for ModuleSelector {
    type Err = UnknownModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(ModuleSelector::All)
        } else {
            s.parse().map(ModuleSelector::One)
        }
    }
}

impl From<TestModule> for ModuleSelector {
    fn from(module: TestModule) -> Self {
        ModuleSelector::One(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("star", Ok(ModuleSelector::One(TestModule::Star)) ; "star")]
    #[test_case("Binary", Ok(ModuleSelector::One(TestModule::Binary)) ; "case insensitive")]
    #[test_case("ASTERO", Ok(ModuleSelector::One(TestModule::Astero)) ; "upper case")]
    #[test_case("all", Ok(ModuleSelector::All) ; "all modules")]
    #[test_case("eos", Err("eos".to_owned()) ; "unknown module")]
    fn parse_selector(input: &str, expected: Result<ModuleSelector, String>) {
        let actual = input.parse::<ModuleSelector>().map_err(|err| err.input().to_owned());
        assert_eq!(actual, expected);
    }

    #[test]
    fn all_is_in_addressing_order() {
        assert_eq!(ModuleSelector::All.modules(), &TestModule::ALL);
        assert_eq!(TestModule::variants(), ["star", "binary", "astero"]);
        assert_eq!(
            ModuleSelector::One(TestModule::Binary).modules(),
            &[TestModule::Binary]
        );
    }
}
