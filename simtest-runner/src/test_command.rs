// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invoking the external programs that build, run and restart a test case.
//!
//! Each test case's working directory carries executables by convention name: `clean`, `mk`,
//! `rn` and `re <photo>`. simtest only interprets their exit status and the files they leave
//! behind.

use crate::{errors::TestCaseSetupError, log_summary::Phase};
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    fs::OpenOptions,
    io::{self, Write},
    process::ExitStatus,
};
use tracing::debug;

/// The combined output log within a working directory.
pub const OUT_FILE_NAME: &str = "out.txt";

/// The error log some external programs write within a working directory.
pub const ERR_FILE_NAME: &str = "err.txt";

/// Environment variables passed to every external program.
///
/// These are set on the child processes only: simtest's own environment is never modified.
#[derive(Clone, Debug, Default)]
pub(crate) struct CommandEnv {
    vars: Vec<(String, String)>,
}

impl CommandEnv {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.vars.push((key, value)),
        }
    }

    #[cfg(test)]
    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The captured result of an external program.
#[derive(Debug)]
pub(crate) struct CommandOutput {
    pub(crate) status: ExitStatus,
    pub(crate) stdout: Vec<u8>,
    pub(crate) stderr: Vec<u8>,
}

/// Runs the conventional programs of one working directory.
#[derive(Debug)]
pub(crate) struct TestCommand<'a> {
    work_dir: &'a Utf8Path,
    env: &'a CommandEnv,
}

impl<'a> TestCommand<'a> {
    pub(crate) fn new(work_dir: &'a Utf8Path, env: &'a CommandEnv) -> Self {
        Self { work_dir, env }
    }

    /// Returns true if the working directory has a program with this name.
    pub(crate) fn has_program(&self, program: &str) -> bool {
        self.work_dir.join(program).is_file()
    }

    /// Runs `./<program> <args>`, blocking until it exits.
    ///
    /// A non-zero exit is not an error here: it's up to the caller to interpret the status.
    pub(crate) fn run(
        &self,
        program: &str,
        args: &[&str],
    ) -> Result<CommandOutput, TestCaseSetupError> {
        let program_path = self.work_dir.join(program);
        debug!(
            "running `./{program}{}` in {}",
            args.iter().map(|arg| format!(" {arg}")).collect::<String>(),
            self.work_dir,
        );

        let mut expression = duct::cmd(program_path.as_std_path(), args)
            .dir(self.work_dir.as_std_path())
            .stdout_capture()
            .stderr_capture()
            .unchecked();
        for (key, value) in &self.env.vars {
            expression = expression.env(key, value);
        }

        let output = expression
            .run()
            .map_err(|err| TestCaseSetupError::CommandExecFailed {
                command: std::iter::once(format!("./{program}"))
                    .chain(args.iter().map(|arg| (*arg).to_owned()))
                    .collect::<Vec<_>>()
                    .join(" "),
                work_dir: self.work_dir.to_owned(),
                err,
            })?;

        Ok(CommandOutput {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// The combined log of a test case: `out.txt`, plus the `err.txt` that gets folded into it.
#[derive(Clone, Debug)]
pub(crate) struct CombinedLog {
    out_path: Utf8PathBuf,
    err_path: Utf8PathBuf,
}

impl CombinedLog {
    pub(crate) fn new(work_dir: &Utf8Path) -> Self {
        Self {
            out_path: work_dir.join(OUT_FILE_NAME),
            err_path: work_dir.join(ERR_FILE_NAME),
        }
    }

    pub(crate) fn path(&self) -> &Utf8Path {
        &self.out_path
    }

    /// Records the output of a phase and returns everything that was added to the log.
    ///
    /// The run phase starts a fresh log. Any `err.txt` left by the program is appended and then
    /// deleted.
    pub(crate) fn record_phase(
        &self,
        phase: Phase,
        output: &CommandOutput,
    ) -> Result<Vec<u8>, TestCaseSetupError> {
        let mut contents = Vec::with_capacity(output.stdout.len() + output.stderr.len());
        contents.extend_from_slice(&output.stdout);
        contents.extend_from_slice(&output.stderr);

        match std::fs::read(&self.err_path) {
            Ok(err) => {
                contents.extend_from_slice(&err);
                std::fs::remove_file(&self.err_path).map_err(|err| {
                    TestCaseSetupError::CleanRemoveFailed {
                        path: self.err_path.clone(),
                        err,
                    }
                })?;
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(TestCaseSetupError::LogWriteFailed {
                    path: self.err_path.clone(),
                    err,
                });
            }
        }

        let truncate = phase == Phase::Run;
        self.write(truncate, &contents)?;
        Ok(contents)
    }

    /// Appends a single line to the log.
    pub(crate) fn append_line(&self, line: &str) -> Result<(), TestCaseSetupError> {
        self.write(false, format!("{line}\n").as_bytes())
    }

    fn write(&self, truncate: bool, contents: &[u8]) -> Result<(), TestCaseSetupError> {
        let mut options = OpenOptions::new();
        options.create(true);
        if truncate {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }

        options
            .open(&self.out_path)
            .and_then(|mut file| file.write_all(contents))
            .map_err(|err| TestCaseSetupError::LogWriteFailed {
                path: self.out_path.clone(),
                err,
            })
    }
}
