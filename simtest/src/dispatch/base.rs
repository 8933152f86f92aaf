// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! State shared by every command: the installation, configuration and run settings.

use super::app::{CommonOpts, ConfigOpts};
use crate::{ExpectedError, Result, output::OutputContext};
use camino::{Utf8Path, Utf8PathBuf};
use simtest_metadata::{ModuleSelector, TestModule};
use simtest_runner::{
    catalog::{CatalogSet, TestSelector, TestSpec},
    config::SimtestConfig,
    errors::InstallationError,
    installation::Installation,
    test_case::TestCaseSettings,
};
use tracing::debug;

pub(super) struct BaseApp {
    pub(super) output: OutputContext,
    pub(super) installation: Installation,
    pub(super) settings: TestCaseSettings,
}

impl BaseApp {
    pub(super) fn new(output: OutputContext, common: CommonOpts) -> Result<Self> {
        let current_dir = current_dir_utf8()?;
        let config = common.config_opts.make_config(&current_dir)?;
        let profile_name = common
            .config_opts
            .profile
            .as_deref()
            .unwrap_or(SimtestConfig::DEFAULT_PROFILE);
        let profile = config.profile(profile_name)?;
        debug!("using profile `{}`", profile.name());

        let root = match common.root {
            Some(root) => root,
            None => root_from_env(profile.root_env_var())?,
        };
        // Test programs are spawned by path from their working directory, so the root must not
        // depend on the current directory.
        let root = if root.is_relative() {
            current_dir.join(root)
        } else {
            root
        };
        let installation = Installation::new(root, common.revision)?;

        let settings = TestCaseSettings::from_profile(&profile).with_compiler(common.compiler);

        Ok(Self {
            output,
            installation,
            settings,
        })
    }

    pub(super) fn load_catalogs(&self, selector: ModuleSelector) -> Result<CatalogSet> {
        Ok(CatalogSet::load(selector, &self.installation)?)
    }
}

impl ConfigOpts {
    fn make_config(&self, current_dir: &Utf8Path) -> Result<SimtestConfig> {
        SimtestConfig::from_sources(current_dir, self.config_file.as_deref())
            .map_err(ExpectedError::from)
    }
}

/// Resolves `tests` against `catalogs`, in the order given. No selectors means every test case.
pub(super) fn select_tests(
    catalogs: &CatalogSet,
    tests: &[TestSelector],
) -> Result<Vec<(TestModule, TestSpec)>> {
    if tests.is_empty() {
        return Ok(catalogs
            .iter()
            .map(|(_, module, spec)| (module, spec.clone()))
            .collect());
    }

    tests
        .iter()
        .map(|selector| {
            let (module, spec) = catalogs.find(selector)?;
            Ok((module, spec.clone()))
        })
        .collect()
}

fn current_dir_utf8() -> Result<Utf8PathBuf> {
    let current_dir =
        std::env::current_dir().map_err(|err| ExpectedError::CurrentDirFailed { err })?;
    Utf8PathBuf::try_from(current_dir)
        .map_err(|err| ExpectedError::CurrentDirInvalidUtf8 { path: err.into_path_buf() })
}

fn root_from_env(env_var: &str) -> Result<Utf8PathBuf> {
    match std::env::var(env_var) {
        Ok(root) if !root.is_empty() => {
            debug!("installation root from `{env_var}`: {root}");
            Ok(root.into())
        }
        _ => Err(InstallationError::RootNotSpecified {
            env_var: env_var.to_owned(),
        }
        .into()),
    }
}
