// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::base::{BaseApp, select_tests};
use crate::{ExpectedError, Result, output::OutputWriter};
use camino::Utf8Path;
use simtest_metadata::{ModuleSelector, SimtestExitCode};
use simtest_runner::{
    catalog::TestSelector,
    installation::InstallationInfo,
    record::read_record,
    reporter::{TestReporterBuilder, write_record_human},
    submission::SubmissionBuilder,
    test_case::TestCase,
};
use std::{io::Write, time::Instant};
use tracing::{info, warn};

pub(super) fn exec_list(
    base: &BaseApp,
    selector: ModuleSelector,
    output_writer: &mut OutputWriter,
) -> Result<i32> {
    let catalogs = base.load_catalogs(selector)?;
    let colorize = base.output.colorize_stdout();

    let mut writer = output_writer.stdout_writer();
    catalogs
        .write_human(&mut writer, colorize)
        .and_then(|()| writer.flush())
        .map_err(|err| ExpectedError::WriteError { err })?;
    Ok(SimtestExitCode::OK)
}

pub(super) fn exec_run(
    base: &BaseApp,
    selector: ModuleSelector,
    tests: &[TestSelector],
    output_writer: &mut OutputWriter,
) -> Result<i32> {
    if !base.installation.is_installed() {
        return Err(ExpectedError::InstallationNotCompiled {
            root: base.installation.root_path().to_owned(),
        });
    }

    let catalogs = base.load_catalogs(selector)?;
    let selected = select_tests(&catalogs, tests)?;
    if selected.is_empty() {
        return Err(ExpectedError::NoTestsRun);
    }

    let colorize = base.output.colorize_stderr();
    let mut reporter = TestReporterBuilder::default()
        .set_colorize(colorize)
        .build(output_writer.stderr_writer());
    let write_error = |err| ExpectedError::WriteError { err };

    let start = Instant::now();
    let total = selected.len();
    for (index, (module, spec)) in selected.into_iter().enumerate() {
        reporter
            .report_started(index + 1, total, module, &spec.name)
            .map_err(write_error)?;

        let name = spec.name.clone();
        let mut test_case = TestCase::new(spec, module, &base.installation);
        test_case
            .run(&base.settings)
            .map_err(|err| ExpectedError::test_case_aborted(module, &name, err))?;
        test_case.save()?;

        reporter.report_finished(&test_case).map_err(write_error)?;
        if base.output.verbose && !test_case.outcome().is_pass() {
            info!(
                "log for `{name}`: {}",
                test_case.work_dir().join("out.txt")
            );
        }
    }

    reporter
        .write_summary(start.elapsed())
        .map_err(write_error)?;
    let failed = reporter.failed();
    reporter
        .into_writer()
        .flush()
        .map_err(write_error)?;

    if failed > 0 {
        Err(ExpectedError::TestRunFailed)
    } else {
        Ok(SimtestExitCode::OK)
    }
}

pub(super) fn exec_show(
    base: &BaseApp,
    selector: ModuleSelector,
    test: &TestSelector,
    output_writer: &mut OutputWriter,
) -> Result<i32> {
    let catalogs = base.load_catalogs(selector)?;
    let (module, spec) = catalogs.find(test)?;
    let work_dir = base.installation.test_suite_path(module).join(&spec.name);
    let record =
        read_record(&work_dir)?.ok_or_else(|| ExpectedError::record_not_found(module, &spec.name))?;

    let colorize = base.output.colorize_stdout();
    let mut writer = output_writer.stdout_writer();
    write_record_human(&record, colorize, &mut writer)
        .and_then(|()| writer.flush())
        .map_err(|err| ExpectedError::WriteError { err })?;
    Ok(SimtestExitCode::OK)
}

pub(super) fn exec_submit(
    base: &BaseApp,
    selector: ModuleSelector,
    tests: &[TestSelector],
    output: Option<&Utf8Path>,
    output_writer: &mut OutputWriter,
) -> Result<i32> {
    let catalogs = base.load_catalogs(selector)?;
    let selected = select_tests(&catalogs, tests)?;
    if selected.is_empty() {
        return Err(ExpectedError::NoTestsRun);
    }

    let mut builder = SubmissionBuilder::new(
        &base.installation,
        base.settings.compiler().map(ToOwned::to_owned),
    );
    for (module, spec) in &selected {
        builder.add_persisted(*module, spec)?;
    }
    let submission = builder
        .build()
        .map_err(|err| ExpectedError::SubmissionBuildError { err })?;
    if !submission.install_success {
        warn!(
            "installation at {} is not compiled, submitting anyway",
            base.installation.root_path()
        );
    }

    let json = submission
        .to_json()
        .map_err(|err| ExpectedError::SubmissionSerializeError { err })?;
    let (passed, failed) = submission.counts();
    match output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .map_err(|err| ExpectedError::submission_write_error(path, err))?;
            info!(
                "wrote submission for revision {} to {path} ({} records: {passed} passed, {failed} failed)",
                submission.revision,
                submission.test_cases.len(),
            );
        }
        None => {
            let mut writer = output_writer.stdout_writer();
            writeln!(writer, "{json}")
                .and_then(|()| writer.flush())
                .map_err(|err| ExpectedError::WriteError { err })?;
        }
    }
    Ok(SimtestExitCode::OK)
}
