// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::Deserialize;
use tracing::warn;

/// A simtest profile that can be obtained from a [`SimtestConfig`](super::SimtestConfig).
///
/// Settings not present in a custom profile are taken from the default profile.
#[derive(Clone, Debug)]
pub struct SimtestProfile<'cfg> {
    name: &'cfg str,
    default_profile: &'cfg ProfileImpl,
    custom_profile: Option<&'cfg ProfileImpl>,
}

impl<'cfg> SimtestProfile<'cfg> {
    pub(super) fn new(
        name: &'cfg str,
        default_profile: &'cfg ProfileImpl,
        custom_profile: Option<&'cfg ProfileImpl>,
    ) -> Self {
        Self {
            name,
            default_profile,
            custom_profile,
        }
    }

    /// Returns the name of the profile.
    pub fn name(&self) -> &'cfg str {
        self.name
    }

    /// Returns the directories, relative to a test case's working directory, that hold
    /// checkpoints.
    pub fn photo_dirs(&self) -> impl Iterator<Item = &'cfg str> + 'cfg {
        self.lookup(|p| p.photo_dirs.as_deref())
            .unwrap_or_default()
            .iter()
            .map(String::as_str)
    }

    /// Returns the name of the environment variable that points test programs at the installation
    /// root.
    pub fn root_env_var(&self) -> &'cfg str {
        self.lookup(|p| p.root_env_var.as_deref())
            .unwrap_or(DEFAULT_ROOT_ENV_VAR)
    }

    /// Returns the thread count exported to test programs, if configured.
    pub fn threads(&self) -> Option<u32> {
        self.lookup(|p| p.threads)
    }

    /// Returns the compiler identifier to report, if configured.
    pub fn compiler(&self) -> Option<&'cfg str> {
        self.lookup(|p| p.compiler.as_deref())
    }

    /// Returns the test cases whose checksums are waived.
    pub fn waived_checksums(&self) -> impl Iterator<Item = &'cfg str> + 'cfg {
        self.lookup(|p| p.waive_checksum.as_deref())
            .unwrap_or_default()
            .iter()
            .map(String::as_str)
    }

    /// Returns true if the checksum of `test_name` is waived.
    pub fn is_checksum_waived(&self, test_name: &str) -> bool {
        self.waived_checksums().any(|waived| waived == test_name)
    }

    /// Returns extra environment variables to set for test programs.
    ///
    /// Entries that aren't of the form `KEY=VALUE` are skipped with a warning.
    pub fn extra_env(&self) -> impl Iterator<Item = (&'cfg str, &'cfg str)> + 'cfg {
        let profile_name = self.name;
        self.lookup(|p| p.extra_env.as_deref())
            .unwrap_or_default()
            .iter()
            .filter_map(move |entry| match entry.split_once('=') {
                Some((key, value)) if !key.is_empty() => Some((key, value)),
                _ => {
                    warn!(
                        "in profile `{profile_name}`, ignoring extra-env entry `{entry}` \
                         (expected KEY=VALUE)"
                    );
                    None
                }
            })
    }

    fn lookup<T>(&self, f: impl Fn(&'cfg ProfileImpl) -> Option<T>) -> Option<T> {
        self.custom_profile
            .and_then(&f)
            .or_else(|| f(self.default_profile))
    }
}

const DEFAULT_ROOT_ENV_VAR: &str = "SIM_DIR";

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct ProfileImpl {
    #[serde(default)]
    photo_dirs: Option<Vec<String>>,
    #[serde(default)]
    root_env_var: Option<String>,
    #[serde(default)]
    threads: Option<u32>,
    #[serde(default)]
    compiler: Option<String>,
    #[serde(default)]
    waive_checksum: Option<Vec<String>>,
    #[serde(default)]
    extra_env: Option<Vec<String>>,
}
