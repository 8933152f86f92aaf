// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loading test catalogues.
//!
//! Each module's test suite carries a catalogue source file (`do1_test_source`) listing its test
//! cases, one `do_one` directive per line:
//!
//! ```text
//! do_one 1.3M_ms_high_Z "stop because log_surface_luminosity" "final.mod" x100
//! do_one make_planets "termination code: max_age" skip skip
//! ```
//!
//! The file mixes directives with shell comments and blank lines, so anything that isn't a
//! well-formed directive is skipped rather than treated as an error.

use crate::{
    errors::{CatalogLoadError, CheckpointPolicyParseError, SelectorDisplay, TestLookupError},
    helpers::plural,
    installation::InstallationInfo,
    reporter::Styles,
};
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use owo_colors::OwoColorize;
use regex::Regex;
use simtest_metadata::{ModuleSelector, TestModule};
use std::{fmt, io, str::FromStr, sync::LazyLock};
use tracing::{debug, trace};

/// The name of the catalogue source file within a module's test suite directory.
pub const CATALOG_FILE_NAME: &str = "do1_test_source";

static FULL_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*do_one\s+([^\s"]+)\s+"([^"]*)"\s+"([^"]+)"\s+"?(skip|auto|x?\d+)"?\s*(?:#.*)?$"#)
        .unwrap()
});

static SKIP_SKIP_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*do_one\s+([^\s"]+)\s+"([^"]*)"\s+skip\s+skip\s*(?:#.*)?$"#).unwrap()
});

/// The photo, if any, that a test case restarts from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CheckpointPolicy {
    /// No restart is performed.
    None,

    /// Restart from the photo with this exact file name.
    Named(String),

    /// Restart from the photo written at this model number.
    NumericIndex(u32),

    /// Pick a photo heuristically from those the run left behind.
    Auto,
}

impl CheckpointPolicy {
    /// Returns true if a restart is requested.
    pub fn requests_restart(&self) -> bool {
        !matches!(self, CheckpointPolicy::None)
    }
}

impl FromStr for CheckpointPolicy {
    type Err = CheckpointPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

        match s {
            "skip" => Ok(CheckpointPolicy::None),
            "auto" => Ok(CheckpointPolicy::Auto),
            _ if all_digits(s) => s
                .parse()
                .map(CheckpointPolicy::NumericIndex)
                .map_err(|_| CheckpointPolicyParseError::new(s)),
            _ if s.strip_prefix('x').is_some_and(all_digits) => {
                Ok(CheckpointPolicy::Named(s.to_owned()))
            }
            _ => Err(CheckpointPolicyParseError::new(s)),
        }
    }
}

impl fmt::Display for CheckpointPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointPolicy::None => f.write_str("skip"),
            CheckpointPolicy::Named(id) => f.write_str(id),
            CheckpointPolicy::NumericIndex(n) => write!(f, "{n}"),
            CheckpointPolicy::Auto => f.write_str("auto"),
        }
    }
}

/// The definition of a single test case, as listed in a catalogue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestSpec {
    /// The name of the test case, unique within its module.
    pub name: String,

    /// A string that must appear (case-insensitively) in the run output. Empty means no textual
    /// check.
    pub success_string: String,

    /// The file name of the final model the run is expected to produce, if checked.
    pub final_model_name: Option<String>,

    /// The photo to restart from.
    pub checkpoint_policy: CheckpointPolicy,
}

/// The result of parsing one line of a catalogue source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedLine {
    /// A well-formed `do_one` directive.
    Directive(TestSpec),

    /// A blank line or a comment.
    Skip,

    /// Anything else.
    Unrecognized,
}

/// Parses a single catalogue line.
pub fn parse_directive(line: &str) -> ParsedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return ParsedLine::Skip;
    }

    if let Some(captures) = FULL_DIRECTIVE.captures(line) {
        let checkpoint_policy = match captures[4].parse() {
            Ok(policy) => policy,
            // The regex only admits valid policies, but a numeric id may overflow.
            Err(_) => return ParsedLine::Unrecognized,
        };
        return ParsedLine::Directive(TestSpec {
            name: captures[1].to_owned(),
            success_string: captures[2].to_owned(),
            final_model_name: Some(captures[3].to_owned()),
            checkpoint_policy,
        });
    }

    if let Some(captures) = SKIP_SKIP_DIRECTIVE.captures(line) {
        return ParsedLine::Directive(TestSpec {
            name: captures[1].to_owned(),
            success_string: captures[2].to_owned(),
            final_model_name: None,
            checkpoint_policy: CheckpointPolicy::None,
        });
    }

    ParsedLine::Unrecognized
}

/// The ordered list of test cases for one module.
#[derive(Clone, Debug)]
pub struct TestCatalog {
    module: TestModule,
    specs: IndexMap<String, TestSpec>,
}

impl TestCatalog {
    /// Parses catalogue text for the given module.
    ///
    /// File order is preserved. If a name appears more than once, the first occurrence wins.
    pub fn parse(module: TestModule, text: &str) -> Self {
        let mut specs = IndexMap::new();
        for (line_number, line) in text.lines().enumerate() {
            match parse_directive(line) {
                ParsedLine::Directive(spec) => {
                    if specs.contains_key(&spec.name) {
                        debug!(
                            "{module}: ignoring duplicate test case `{}` on line {}",
                            spec.name,
                            line_number + 1,
                        );
                        continue;
                    }
                    specs.insert(spec.name.clone(), spec);
                }
                ParsedLine::Skip => {}
                ParsedLine::Unrecognized => {
                    trace!("{module}: skipping line {}: {line}", line_number + 1);
                }
            }
        }

        Self { module, specs }
    }

    /// Reads and parses the catalogue for `module` from the installation.
    pub fn load(
        module: TestModule,
        installation: &dyn InstallationInfo,
    ) -> Result<Self, CatalogLoadError> {
        let path = Self::source_path(module, installation);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogLoadError::NotFound { module, path });
            }
            Err(err) => return Err(CatalogLoadError::Read { module, path, err }),
        };

        let catalog = Self::parse(module, &text);
        debug!(
            "loaded {} test cases for module `{module}` from {path}",
            catalog.len()
        );
        Ok(catalog)
    }

    /// Returns the path of the catalogue source file for `module`.
    pub fn source_path(module: TestModule, installation: &dyn InstallationInfo) -> Utf8PathBuf {
        installation.test_suite_path(module).join(CATALOG_FILE_NAME)
    }

    /// Returns the module this catalogue belongs to.
    pub fn module(&self) -> TestModule {
        self.module
    }

    /// Returns the number of test cases.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns true if the catalogue has no test cases.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Looks up a test case by name.
    pub fn get(&self, name: &str) -> Option<&TestSpec> {
        self.specs.get(name)
    }

    /// Looks up a test case by its 1-based position.
    pub fn get_index(&self, index: usize) -> Option<&TestSpec> {
        let zero_based = index.checked_sub(1)?;
        self.specs.get_index(zero_based).map(|(_, spec)| spec)
    }

    /// Iterates over test cases in catalogue order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &TestSpec> + '_ {
        self.specs.values()
    }
}

/// How a test case is addressed on the command line: by name or by 1-based position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TestSelector {
    /// Look up by name.
    Name(String),
    /// Look up by 1-based position.
    Index(usize),
}

impl FromStr for TestSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<usize>() {
            Ok(index) => Ok(TestSelector::Index(index)),
            Err(_) => Ok(TestSelector::Name(s.to_owned())),
        }
    }
}

impl fmt::Display for TestSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestSelector::Name(name) => f.write_str(name),
            TestSelector::Index(index) => write!(f, "#{index}"),
        }
    }
}

/// The catalogues of one or more modules, in addressing order.
#[derive(Clone, Debug)]
pub struct CatalogSet {
    selector: ModuleSelector,
    catalogs: Vec<TestCatalog>,
}

impl CatalogSet {
    /// Loads the catalogues for every module covered by `selector`.
    ///
    /// Fails if any covered module's catalogue fails to load: a set never contains a partially
    /// loaded module.
    pub fn load(
        selector: ModuleSelector,
        installation: &dyn InstallationInfo,
    ) -> Result<Self, CatalogLoadError> {
        let catalogs = selector
            .modules()
            .iter()
            .map(|&module| TestCatalog::load(module, installation))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            selector,
            catalogs,
        })
    }

    /// Creates a set from catalogues that have already been loaded.
    pub fn from_catalogs(selector: ModuleSelector, catalogs: Vec<TestCatalog>) -> Self {
        Self {
            selector,
            catalogs,
        }
    }

    /// Returns the selector this set was loaded for.
    pub fn selector(&self) -> ModuleSelector {
        self.selector
    }

    /// Returns the catalogues in addressing order.
    pub fn catalogs(&self) -> &[TestCatalog] {
        &self.catalogs
    }

    /// Returns the total number of test cases across all modules.
    pub fn len(&self) -> usize {
        self.catalogs.iter().map(TestCatalog::len).sum()
    }

    /// Returns true if no module has any test cases.
    pub fn is_empty(&self) -> bool {
        self.catalogs.iter().all(TestCatalog::is_empty)
    }

    /// Iterates over every test case along with its module and cumulative 1-based index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, TestModule, &TestSpec)> + '_ {
        self.catalogs
            .iter()
            .flat_map(|catalog| catalog.iter().map(move |spec| (catalog.module(), spec)))
            .enumerate()
            .map(|(i, (module, spec))| (i + 1, module, spec))
    }

    /// Looks up a test case by name or by cumulative 1-based position.
    ///
    /// Names are searched module by module in addressing order, so the first module defining a
    /// name wins.
    pub fn find(
        &self,
        selector: &TestSelector,
    ) -> Result<(TestModule, &TestSpec), TestLookupError> {
        match selector {
            TestSelector::Name(name) => self
                .catalogs
                .iter()
                .find_map(|catalog| catalog.get(name).map(|spec| (catalog.module(), spec)))
                .ok_or_else(|| TestLookupError::NameNotFound {
                    name: name.clone(),
                    selector: SelectorDisplay(self.selector),
                }),
            TestSelector::Index(index) => {
                let mut remaining = *index;
                for catalog in &self.catalogs {
                    if remaining >= 1 && remaining <= catalog.len() {
                        let spec = catalog
                            .get_index(remaining)
                            .expect("index was checked to be in range");
                        return Ok((catalog.module(), spec));
                    }
                    remaining = remaining.saturating_sub(catalog.len());
                    if remaining == 0 {
                        break;
                    }
                }
                Err(TestLookupError::IndexOutOfRange {
                    index: *index,
                    selector: SelectorDisplay(self.selector),
                    count: self.len(),
                })
            }
        }
    }

    /// Writes the catalogue in human-readable form: each module followed by its test cases and
    /// their indexes.
    pub fn write_human(&self, writer: &mut dyn io::Write, colorize: bool) -> io::Result<()> {
        let mut styles = Styles::default();
        if colorize {
            styles.colorize();
        }

        let width = self.len().to_string().len();
        let mut index = 0;
        for catalog in &self.catalogs {
            writeln!(
                writer,
                "{} ({} {}):",
                catalog.module().style(styles.module),
                catalog.len().style(styles.count),
                plural::tests_str(catalog.len()),
            )?;
            for spec in catalog.iter() {
                index += 1;
                writeln!(
                    writer,
                    "    {:>width$} {}",
                    index.style(styles.count),
                    spec.name.style(styles.test_name),
                )?;
            }
        }
        Ok(())
    }
}
