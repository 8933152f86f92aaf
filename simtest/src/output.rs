// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Console setup: color detection, the log subscriber and the writers commands print to.
//!
//! Log events go to stderr. Events on [`NO_HEADING_TARGET`] are printed bare, without a level,
//! so that multi-line error reports read as one block. Messages may carry their own styling, so
//! escape sequences in them are passed through.

use clap::{Args, ValueEnum};
use owo_colors::{Style, style};
use std::{
    io::{self, Write},
    sync::Once,
};
use supports_color::Stream;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{Layer, filter::Targets, layer::SubscriberExt, util::SubscriberInitExt};

/// Events logged to this target are printed without a level heading.
pub(crate) const NO_HEADING_TARGET: &str = "simtest::no_heading";

/// The environment variable used to configure log levels.
pub(crate) const LOG_ENV_VAR: &str = "SIMTEST_LOG";

#[derive(Copy, Clone, Debug, Args)]
#[must_use]
pub(crate) struct OutputOpts {
    /// Verbose output
    #[arg(long, short, global = true, env = "SIMTEST_VERBOSE")]
    pub(crate) verbose: bool,

    /// Produce color output: auto, always, never
    #[arg(
        long,
        value_enum,
        default_value_t,
        hide_possible_values = true,
        global = true,
        value_name = "WHEN",
        env = "SIMTEST_COLOR"
    )]
    pub(crate) color: Color,
}

impl OutputOpts {
    /// Resolves colors and installs the log subscriber. Only the first call installs it.
    pub(crate) fn init(self) -> OutputContext {
        let output = OutputContext::new(self.verbose, self.color);
        output.init_logger();
        output
    }
}

/// Whether to color output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Default)]
#[must_use]
pub enum Color {
    /// Color if the stream is a terminal that supports it.
    #[default]
    Auto,
    /// Always color.
    Always,
    /// Never color.
    Never,
}

impl Color {
    fn resolve(self, stream: Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

/// Output settings for the current invocation, with colors resolved per stream.
#[derive(Copy, Clone, Debug)]
#[must_use]
pub struct OutputContext {
    pub(crate) verbose: bool,
    stdout_color: bool,
    stderr_color: bool,
}

impl OutputContext {
    pub(crate) fn new(verbose: bool, color: Color) -> Self {
        Self {
            verbose,
            stdout_color: color.resolve(Stream::Stdout),
            stderr_color: color.resolve(Stream::Stderr),
        }
    }

    /// Returns true if output written to stdout should be colored.
    pub(crate) fn colorize_stdout(&self) -> bool {
        self.stdout_color
    }

    /// Returns true if output written to stderr should be colored.
    pub(crate) fn colorize_stderr(&self) -> bool {
        self.stderr_color
    }

    /// Returns the styles used when reporting an error.
    pub fn error_styles(&self) -> ErrorStyles {
        if self.stderr_color {
            ErrorStyles {
                emphasis: style().bold(),
                hint: style().yellow(),
            }
        } else {
            ErrorStyles::default()
        }
    }

    fn init_logger(&self) {
        static INIT_LOGGER: Once = Once::new();

        let ansi = self.stderr_color;
        let targets = log_targets(std::env::var(LOG_ENV_VAR).ok().as_deref(), self.verbose);
        INIT_LOGGER.call_once(|| {
            let headed = tracing_subscriber::fmt::layer()
                .without_time()
                .with_target(false)
                .with_ansi(ansi)
                .with_ansi_sanitization(false)
                .with_writer(io::stderr)
                .with_filter(targets.with_target(NO_HEADING_TARGET, LevelFilter::OFF));
            let bare = tracing_subscriber::fmt::layer()
                .without_time()
                .with_target(false)
                .with_level(false)
                .with_ansi(ansi)
                .with_ansi_sanitization(false)
                .with_writer(io::stderr)
                .with_filter(Targets::new().with_target(NO_HEADING_TARGET, LevelFilter::TRACE));

            tracing_subscriber::registry().with(headed).with(bare).init();
        });
    }
}

/// Returns the log filter to use.
///
/// An explicit `SIMTEST_LOG` wins. Otherwise the default level is `info`, raised to `debug` with
/// `--verbose`. An unparseable `SIMTEST_LOG` falls back to the default with a message on stderr,
/// since the logger isn't available yet.
fn log_targets(env_value: Option<&str>, verbose: bool) -> Targets {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let default = Targets::new().with_default(default_level);

    match env_value {
        None | Some("") => default,
        Some(level_str) => level_str.parse::<Targets>().unwrap_or_else(|error| {
            eprintln!("ignoring invalid {LOG_ENV_VAR} value `{level_str}`: {error}");
            default
        }),
    }
}

/// Styles for error messages printed to stderr.
#[derive(Debug, Default)]
pub struct ErrorStyles {
    pub(crate) emphasis: Style,
    pub(crate) hint: Style,
}

/// Where commands write their output.
///
/// Tests capture both streams instead of printing them.
#[derive(Default)]
pub enum OutputWriter {
    /// Write to the process's stdout and stderr.
    #[default]
    Normal,
    /// Capture output.
    #[cfg(test)]
    Test {
        /// Captured stdout.
        stdout: Vec<u8>,
        /// Captured stderr.
        stderr: Vec<u8>,
    },
}

impl OutputWriter {
    pub(crate) fn stdout_writer(&mut self) -> Box<dyn Write + '_> {
        match self {
            Self::Normal => Box::new(io::stdout().lock()),
            #[cfg(test)]
            Self::Test { stdout, .. } => Box::new(stdout),
        }
    }

    pub(crate) fn stderr_writer(&mut self) -> Box<dyn Write + '_> {
        match self {
            Self::Normal => Box::new(io::stderr().lock()),
            #[cfg(test)]
            Self::Test { stderr, .. } => Box::new(stderr),
        }
    }
}
