// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The installation of the simulation code that test cases run against.
//!
//! Test cases only ever read from an installation: fetching, checking out and compiling it happen
//! elsewhere.

use crate::errors::InstallationError;
use camino::{Utf8Path, Utf8PathBuf};
use simtest_metadata::TestModule;
use tracing::{debug, warn};

/// Read-only facts about an installation.
pub trait InstallationInfo {
    /// Returns true if the installation has been compiled.
    fn is_installed(&self) -> bool;

    /// Returns the root directory of the installation.
    fn root_path(&self) -> &Utf8Path;

    /// Returns the test suite directory for `module`.
    fn test_suite_path(&self, module: TestModule) -> Utf8PathBuf {
        self.root_path().join(module.as_str()).join("test_suite")
    }

    /// Returns the revision or commit SHA of the installation.
    fn revision(&self) -> &str;
}

/// An installation on the local filesystem.
#[derive(Clone, Debug)]
pub struct Installation {
    root: Utf8PathBuf,
    revision: String,
}

impl Installation {
    /// The file, relative to the root, that records the installation's version.
    pub const VERSION_FILE: &'static str = "data/version_number";

    /// The revision reported when none was given and the version file is absent.
    pub const UNKNOWN_REVISION: &'static str = "unknown";

    /// Creates a new installation rooted at `root`.
    ///
    /// If `revision` is `None`, it is read from [`Self::VERSION_FILE`].
    pub fn new(
        root: impl Into<Utf8PathBuf>,
        revision: Option<String>,
    ) -> Result<Self, InstallationError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(InstallationError::RootMissing { root });
        }

        let revision = match revision {
            Some(revision) => revision,
            None => Self::read_revision(&root),
        };
        debug!("using installation at {root} (revision {revision})");

        Ok(Self { root, revision })
    }

    fn read_revision(root: &Utf8Path) -> String {
        let version_file = root.join(Self::VERSION_FILE);
        match std::fs::read_to_string(&version_file) {
            Ok(contents) if !contents.trim().is_empty() => contents.trim().to_owned(),
            Ok(_) => {
                warn!("version file {version_file} is empty, revision is unknown");
                Self::UNKNOWN_REVISION.to_owned()
            }
            Err(error) => {
                warn!("failed to read version file {version_file} ({error}), revision is unknown");
                Self::UNKNOWN_REVISION.to_owned()
            }
        }
    }
}

impl InstallationInfo for Installation {
    fn is_installed(&self) -> bool {
        let lib_dir = self.root.join("lib");
        let lib_populated = std::fs::read_dir(&lib_dir)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if !lib_populated {
            debug!("{lib_dir} is missing or empty, installation is not compiled");
            return false;
        }

        TestModule::ALL.iter().all(|&module| {
            let test_suite = self.test_suite_path(module);
            let exists = test_suite.is_dir();
            if !exists {
                debug!("test suite for `{module}` not found at {test_suite}");
            }
            exists
        })
    }

    fn root_path(&self) -> &Utf8Path {
        &self.root
    }

    fn revision(&self) -> &str {
        &self.revision
    }
}
