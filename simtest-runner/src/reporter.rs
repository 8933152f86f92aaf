// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Console output for test runs.
//!
//! The reporter prints a status line as each test case starts and finishes, and a summary at the
//! end of the run. It writes to any [`Write`] so that output can be captured in tests.

use crate::{
    helpers::{FormattedDuration, plural},
    outcome::TestOutcome,
    test_case::TestCase,
};
use owo_colors::{OwoColorize, Style};
use simtest_metadata::{FailureType, SuccessType, TestCaseRecord, TestModule, TestOutcomeSummary};
use std::{
    io::{self, Write},
    time::Duration,
};

#[derive(Clone, Debug, Default)]
pub(crate) struct Styles {
    pub(crate) count: Style,
    pub(crate) pass: Style,
    pub(crate) fail: Style,
    pub(crate) skip: Style,
    pub(crate) module: Style,
    pub(crate) test_name: Style,
    pub(crate) field: Style,
}

impl Styles {
    pub(crate) fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow().bold();
        self.module = Style::new().magenta().bold();
        self.test_name = Style::new().blue().bold();
        self.field = Style::new().yellow().bold();
    }
}

/// Builder for [`TestReporter`].
#[derive(Debug, Default)]
pub struct TestReporterBuilder {
    colorize: bool,
}

impl TestReporterBuilder {
    /// Sets whether output is colorized.
    pub fn set_colorize(&mut self, colorize: bool) -> &mut Self {
        self.colorize = colorize;
        self
    }

    /// Creates a reporter that writes to `writer`.
    pub fn build<W: Write>(&self, writer: W) -> TestReporter<W> {
        let mut styles = Styles::default();
        if self.colorize {
            styles.colorize();
        }
        TestReporter {
            styles,
            writer,
            passed: 0,
            failed: 0,
        }
    }
}

/// Prints progress and results of a test run.
#[derive(Debug)]
pub struct TestReporter<W> {
    styles: Styles,
    writer: W,
    passed: usize,
    failed: usize,
}

impl<W: Write> TestReporter<W> {
    /// Reports that a test case is about to run.
    pub fn report_started(
        &mut self,
        index: usize,
        total: usize,
        module: TestModule,
        name: &str,
    ) -> io::Result<()> {
        let width = total.to_string().len();
        writeln!(
            self.writer,
            "{:>12} [{:>width$}/{total}] {} {}",
            "START".style(self.styles.pass),
            index,
            module.style(self.styles.module),
            name.style(self.styles.test_name),
        )
    }

    /// Reports a finished test case.
    pub fn report_finished(&mut self, test_case: &TestCase<'_>) -> io::Result<()> {
        let (status, style) = match test_case.outcome() {
            TestOutcome::Pass(_) => {
                self.passed += 1;
                ("PASS", self.styles.pass)
            }
            TestOutcome::Fail(_) => {
                self.failed += 1;
                ("FAIL", self.styles.fail)
            }
            TestOutcome::NotTested => ("SKIP", self.styles.skip),
        };

        let elapsed = test_case.total_runtime_seconds().unwrap_or_default();
        write!(
            self.writer,
            "{:>12} [{:>8.3}s] {} {}",
            status.style(style),
            elapsed,
            test_case.module().style(self.styles.module),
            test_case.name().style(self.styles.test_name),
        )?;
        match test_case.outcome() {
            TestOutcome::Pass(success_type) => {
                writeln!(self.writer, " ({})", success_type_str(success_type))?;
            }
            TestOutcome::Fail(_) | TestOutcome::NotTested => writeln!(self.writer)?,
        }

        if let Some(message) = test_case.failure_message() {
            writeln!(self.writer, "{:>12} {message}", "")?;
        }
        Ok(())
    }

    /// Writes the final summary line.
    pub fn write_summary(&mut self, elapsed: Duration) -> io::Result<()> {
        let run = self.passed + self.failed;
        // Round to milliseconds so humantime doesn't print sub-millisecond noise.
        let elapsed = Duration::from_millis(elapsed.as_millis() as u64);
        write!(
            self.writer,
            "{:>12} [{}] {} {} run: {} {}",
            "Summary".style(self.styles.count),
            humantime::format_duration(elapsed),
            run.style(self.styles.count),
            plural::tests_str(run),
            self.passed.style(self.styles.count),
            "passed".style(self.styles.pass),
        )?;
        if self.failed > 0 {
            write!(
                self.writer,
                ", {} {}",
                self.failed.style(self.styles.count),
                "failed".style(self.styles.fail),
            )?;
        }
        writeln!(self.writer)
    }

    /// Returns the number of test cases that passed so far.
    pub fn passed(&self) -> usize {
        self.passed
    }

    /// Returns the number of test cases that failed so far.
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Consumes the reporter and returns the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

/// Writes a human-readable rendition of a persisted record.
pub fn write_record_human(
    record: &TestCaseRecord,
    colorize: bool,
    writer: &mut dyn Write,
) -> io::Result<()> {
    let mut styles = Styles::default();
    if colorize {
        styles.colorize();
    }

    let outcome_style = match record.outcome {
        TestOutcomeSummary::Pass => styles.pass,
        TestOutcomeSummary::Fail => styles.fail,
        TestOutcomeSummary::NotTested => styles.skip,
    };
    writeln!(
        writer,
        "{} {}: {}",
        record.module.style(styles.module),
        record.name.style(styles.test_name),
        record.outcome.style(outcome_style),
    )?;

    let mut field = |name: &str, value: Option<String>| -> io::Result<()> {
        match value {
            Some(value) => writeln!(writer, "  {}: {value}", name.style(styles.field)),
            None => Ok(()),
        }
    };
    let seconds = |s: Option<f64>| s.map(display_record_seconds);

    field(
        "success type",
        record.success_type.map(|t| success_type_str(t).to_owned()),
    )?;
    field(
        "failure type",
        record.failure_type.map(|t| failure_type_str(t).to_owned()),
    )?;
    field("failure", record.failure_message.clone())?;
    field("started at", record.started_at.map(|t| t.to_rfc3339()))?;
    field("run time", seconds(record.build_runtime_seconds))?;
    field("restart time", seconds(record.restart_runtime_seconds))?;
    field("total time", seconds(record.total_runtime_seconds))?;
    field("threads", record.thread_count.map(|n| n.to_string()))?;
    field("checksum", record.checksum.clone())?;
    field("steps", record.step_count.map(|n| n.to_string()))?;
    field("retries", record.retry_count.map(|n| n.to_string()))?;
    field("backups", record.backup_count.map(|n| n.to_string()))?;
    field(
        "runtime (minutes)",
        record.runtime_minutes.map(|m| format!("{m:.2}")),
    )?;
    field("compiler", record.compiler.clone())?;
    if let Some(summary) = &record.summary_text {
        writeln!(writer, "  {}:", "summary".style(styles.field))?;
        for line in summary.lines() {
            writeln!(writer, "    {line}")?;
        }
    }
    Ok(())
}

// Records are read back from disk, so the value may be negative, infinite or NaN.
fn display_record_seconds(seconds: f64) -> String {
    match Duration::try_from_secs_f64(seconds) {
        Ok(duration) => FormattedDuration(duration).to_string(),
        Err(_) => format!("{seconds}s"),
    }
}

fn success_type_str(success_type: SuccessType) -> &'static str {
    match success_type {
        SuccessType::RunTestString => "run test string",
        SuccessType::PhotoChecksum => "photo checksum",
    }
}

fn failure_type_str(failure_type: FailureType) -> &'static str {
    match failure_type {
        FailureType::Compilation => "compilation",
        FailureType::RunTestString => "run test string",
        FailureType::FinalModelMissing => "final model missing",
        FailureType::PhotoFileMissing => "photo file missing",
        FailureType::PhotoChecksum => "photo checksum",
        FailureType::PhotoDiff => "photo diff",
    }
}
