// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{ProfileImpl, SimtestProfile};
use crate::errors::{ConfigParseError, ConfigParseErrorKind, ProfileNotFound};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Overall configuration for simtest.
///
/// This is the root data structure for simtest configuration. Most runner-specific configuration
/// is managed through [profiles](SimtestProfile), obtained through the [`profile`](Self::profile)
/// method.
#[derive(Clone, Debug)]
pub struct SimtestConfig {
    config_dir: Utf8PathBuf,
    default_profile: ProfileImpl,
    other_profiles: BTreeMap<String, ProfileImpl>,
}

impl SimtestConfig {
    /// The default location of the config within the config directory:
    /// `.config/simtest.toml`.
    pub const CONFIG_PATH: &'static str = ".config/simtest.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// The name of the default profile.
    pub const DEFAULT_PROFILE: &'static str = "default";

    /// Reads the simtest config from the given file, or if not specified from
    /// `.config/simtest.toml` in `config_dir`.
    ///
    /// If the file isn't specified and the directory doesn't have `.config/simtest.toml`, uses the
    /// default config options.
    pub fn from_sources(
        config_dir: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let config_dir = config_dir.into();
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = config_dir.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (deserialized, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        if !unknown.is_empty() {
            warn!(
                "ignoring unknown configuration keys in config file {config_file}: {}",
                unknown.iter().join(", ")
            );
        }

        Self::from_deserialized(config_dir, deserialized)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))
    }

    /// Returns the default simtest config.
    pub fn default_config(config_dir: impl Into<Utf8PathBuf>) -> Self {
        let (deserialized, unknown) =
            Self::build_and_deserialize_config(&Self::make_default_config())
                .expect("default config is always valid");

        // The default config is embedded in this binary, so it must not have any unknown keys.
        assert!(
            unknown.is_empty(),
            "found unknown keys in default config: {}",
            unknown.iter().join(", ")
        );

        Self::from_deserialized(config_dir.into(), deserialized)
            .expect("default config is always valid")
    }

    /// Returns the directory configuration was read relative to.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Returns the profile with the given name, or an error if it isn't known.
    pub fn profile(&self, name: impl AsRef<str>) -> Result<SimtestProfile<'_>, ProfileNotFound> {
        let name = name.as_ref();
        if name == Self::DEFAULT_PROFILE {
            return Ok(SimtestProfile::new(
                Self::DEFAULT_PROFILE,
                &self.default_profile,
                None,
            ));
        }

        match self.other_profiles.get_key_value(name) {
            Some((name, custom)) => Ok(SimtestProfile::new(
                name,
                &self.default_profile,
                Some(custom),
            )),
            None => Err(ProfileNotFound::new(name, self.profile_names())),
        }
    }

    /// Returns the names of all known profiles.
    pub fn profile_names(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(Self::DEFAULT_PROFILE).chain(self.other_profiles.keys().map(String::as_str))
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn from_deserialized(
        config_dir: Utf8PathBuf,
        mut deserialized: SimtestConfigDeserialize,
    ) -> Result<Self, ConfigParseErrorKind> {
        let default_profile = deserialized
            .profiles
            .remove(Self::DEFAULT_PROFILE)
            .ok_or_else(|| ConfigParseErrorKind::DefaultProfileNotFound {
                default_profile: Self::DEFAULT_PROFILE.to_owned(),
                all_profiles: deserialized.profiles.keys().cloned().collect(),
            })?;

        Ok(Self {
            config_dir,
            default_profile,
            other_profiles: deserialized.profiles,
        })
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(SimtestConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: SimtestConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // Both serde_path_to_error and the config crate report the key. Drop the key from
                // the config error for consistency.
                let path = error.path().clone();
                let config_error = error.into_inner();
                let error = match config_error {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SimtestConfigDeserialize {
    #[serde(default, rename = "profile")]
    profiles: BTreeMap<String, ProfileImpl>,
}
