// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-level application and command routing.

use super::{base::BaseApp, commands};
use crate::{
    Result,
    output::{OutputContext, OutputOpts, OutputWriter},
};
use camino::Utf8PathBuf;
use clap::{Args, Subcommand};
use simtest_metadata::ModuleSelector;
use simtest_runner::catalog::TestSelector;

/// Build, run and verify simulation test cases.
///
/// Test cases are listed in each module's catalogue inside the installation. Every run leaves a
/// result record in the test case's working directory, which `show` and `submit` read back.
#[derive(Debug, clap::Parser)]
#[command(
    version,
    bin_name = "simtest",
    max_term_width = 100,
)]
pub struct SimtestApp {
    #[clap(flatten)]
    common: CommonOpts,

    #[clap(subcommand)]
    command: Command,
}

impl SimtestApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.common.output.init()
    }

    /// Executes the app.
    ///
    /// Returns the exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let base = BaseApp::new(output, self.common)?;
        match self.command {
            Command::List { module } => commands::exec_list(&base, module, output_writer),
            Command::Run(opts) => {
                commands::exec_run(&base, opts.module, &opts.tests, output_writer)
            }
            Command::Show { module, test } => {
                commands::exec_show(&base, module, &test, output_writer)
            }
            Command::Submit(opts) => commands::exec_submit(
                &base,
                opts.module,
                &opts.tests,
                opts.output.as_deref(),
                output_writer,
            ),
        }
    }
}

/// Options shared by every command.
#[derive(Debug, Args)]
pub(super) struct CommonOpts {
    /// Installation root [default: the profile's `root-env-var`, usually `$SIM_DIR`].
    #[arg(long, global = true, value_name = "DIR")]
    pub(super) root: Option<Utf8PathBuf>,

    /// Revision of the installation to report [default: read from `data/version_number`].
    #[arg(long, global = true, value_name = "REVISION")]
    pub(super) revision: Option<String>,

    /// Compiler identity to record, overriding the profile's `compiler`.
    #[arg(long, global = true, value_name = "NAME")]
    pub(super) compiler: Option<String>,

    #[clap(flatten)]
    pub(super) output: OutputOpts,

    #[clap(flatten)]
    pub(super) config_opts: ConfigOpts,
}

/// Configuration options for simtest.
#[derive(Debug, Args)]
#[command(next_help_heading = "Config options")]
pub(super) struct ConfigOpts {
    /// Config file [default: .config/simtest.toml in the current directory].
    #[arg(long, global = true, value_name = "PATH")]
    pub(super) config_file: Option<Utf8PathBuf>,

    /// The simtest profile to use.
    #[arg(long, short = 'P', env = "SIMTEST_PROFILE", global = true)]
    pub(super) profile: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List test cases with their indexes.
    ///
    /// Indexes are 1-based. When listing all modules, indexes are cumulative across modules in
    /// the order star, binary, astero.
    List {
        /// Module to list, or `all`.
        #[arg(value_name = "MODULE", default_value = "all")]
        module: ModuleSelector,
    },

    /// Build, run and verify test cases.
    Run(RunOpts),

    /// Show the persisted result of a test case.
    Show {
        /// Module to look the test case up in, or `all`.
        #[arg(long, short, value_name = "MODULE", default_value = "all")]
        module: ModuleSelector,

        /// Test case name or 1-based index.
        #[arg(value_name = "TEST")]
        test: TestSelector,
    },

    /// Assemble persisted results into a submission payload.
    Submit(SubmitOpts),
}

#[derive(Debug, Args)]
struct RunOpts {
    /// Module to run test cases from, or `all`.
    #[arg(long, short, value_name = "MODULE", default_value = "all")]
    module: ModuleSelector,

    /// Test case names or 1-based indexes [default: every test case in the module].
    #[arg(value_name = "TESTS")]
    tests: Vec<TestSelector>,
}

#[derive(Debug, Args)]
struct SubmitOpts {
    /// Module to collect results from, or `all`.
    #[arg(long, short, value_name = "MODULE", default_value = "all")]
    module: ModuleSelector,

    /// Write the payload to this file instead of stdout.
    #[arg(long, short, value_name = "PATH")]
    output: Option<Utf8PathBuf>,

    /// Test case names or 1-based indexes [default: every test case in the module].
    #[arg(value_name = "TESTS")]
    tests: Vec<TestSelector>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Parser, error::ErrorKind};

    #[test]
    fn test_argument_parsing() {
        let valid: &[&'static str] = &[
            // ---
            // Basic commands
            // ---
            "simtest list",
            "simtest list star",
            "simtest list ALL",
            "simtest run",
            "simtest run 1 2 wd_cool",
            "simtest run --module binary evolve_both_stars",
            "simtest show 12",
            "simtest show -m astero fast_from_file",
            "simtest submit",
            "simtest submit --output results.json -m star",
            // ---
            // Global options
            // ---
            "simtest --root /opt/sim --revision r15140 run",
            "simtest run --compiler gfortran --profile ci",
            "simtest -P ci --config-file simtest.toml list",
            "simtest run -v --color never",
        ];

        let invalid: &[(&'static str, ErrorKind)] = &[
            ("simtest list eos", ErrorKind::ValueValidation),
            ("simtest run --module eos", ErrorKind::ValueValidation),
            ("simtest show", ErrorKind::MissingRequiredArgument),
            ("simtest run --color sometimes", ErrorKind::InvalidValue),
        ];

        for valid_args in valid {
            let cmd = shell_words::split(valid_args).expect("valid command line");
            if let Err(error) = SimtestApp::try_parse_from(cmd) {
                panic!("{valid_args} should have successfully parsed, but didn't: {error}");
            }
        }

        for &(invalid_args, kind) in invalid {
            match SimtestApp::try_parse_from(
                shell_words::split(invalid_args).expect("valid command"),
            ) {
                Ok(_) => {
                    panic!("{invalid_args} should have errored out but successfully parsed");
                }
                Err(error) => {
                    let actual_kind = error.kind();
                    if kind != actual_kind {
                        panic!(
                            "{invalid_args} should error with kind {kind:?}, but actual kind was {actual_kind:?}",
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn run_selectors() {
        let app = SimtestApp::try_parse_from(["simtest", "run", "-m", "star", "3", "wd_cool"])
            .expect("valid command line");
        let Command::Run(opts) = app.command else {
            panic!("expected run command");
        };
        assert_eq!(opts.module, ModuleSelector::One(simtest_metadata::TestModule::Star));
        assert_eq!(
            opts.tests,
            [
                TestSelector::Index(3),
                TestSelector::Name("wd_cool".to_owned()),
            ]
        );
    }
}
