// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The lifecycle of a single test case.
//!
//! A test case moves through clean, build, run, verification and (optionally) a restart from a
//! photo, after which it is classified as passing or failing. Conditions that prevent an outcome
//! from being determined at all are returned as [`TestCaseSetupError`]s instead.
//!
//! External programs run synchronously, one test case at a time, and no timeout is applied to
//! them. A driver that needs one must enforce it around the whole process, for example with a
//! watchdog that kills the process group.

use crate::{
    catalog::{CheckpointPolicy, TestSpec},
    checkpoint::{clear_photos, resolve_photo},
    checksum::{WAIVED_CHECKSUM, file_checksum},
    config::SimtestProfile,
    errors::{RecordWriteError, TestCaseSetupError},
    helpers::display_exited_with,
    installation::InstallationInfo,
    log_summary::{Phase, RunStatistics, phase_marker},
    outcome::{ChecksumComparison, TestOutcome, VerificationStep, classify, failure_message},
    record::{RECORD_FILE_NAME, write_record},
    test_command::{CombinedLog, CommandEnv, ERR_FILE_NAME, OUT_FILE_NAME, TestCommand},
    time::stopwatch,
};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, FixedOffset};
use debug_ignore::DebugIgnore;
use simtest_metadata::{TestCaseRecord, TestModule, TestOutcomeSummary};
use std::{collections::BTreeSet, io};
use tracing::{debug, info, warn};

/// Settings shared by every test case in a run, usually derived from a profile.
#[derive(Clone, Debug)]
pub struct TestCaseSettings {
    photo_dirs: Vec<String>,
    root_env_var: String,
    thread_count: u32,
    extra_env: Vec<(String, String)>,
    compiler: Option<String>,
    waived: BTreeSet<String>,
}

impl TestCaseSettings {
    /// Creates settings from a profile.
    ///
    /// If the profile doesn't set a thread count, the inherited `OMP_NUM_THREADS` is used, or 1 if
    /// that isn't set either.
    pub fn from_profile(profile: &SimtestProfile<'_>) -> Self {
        let thread_count = profile.threads().unwrap_or_else(|| {
            std::env::var("OMP_NUM_THREADS")
                .ok()
                .and_then(|threads| threads.trim().parse().ok())
                .unwrap_or(1)
        });

        Self {
            photo_dirs: profile.photo_dirs().map(ToOwned::to_owned).collect(),
            root_env_var: profile.root_env_var().to_owned(),
            thread_count,
            extra_env: profile
                .extra_env()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
            compiler: profile.compiler().map(ToOwned::to_owned),
            waived: profile.waived_checksums().map(ToOwned::to_owned).collect(),
        }
    }

    /// Overrides the compiler identity, if `compiler` is `Some`.
    pub fn with_compiler(mut self, compiler: Option<String>) -> Self {
        if compiler.is_some() {
            self.compiler = compiler;
        }
        self
    }

    /// Overrides the thread count.
    pub fn with_thread_count(mut self, thread_count: u32) -> Self {
        self.thread_count = thread_count;
        self
    }

    /// Returns the thread count passed to external programs.
    pub fn thread_count(&self) -> u32 {
        self.thread_count
    }

    /// Returns the compiler identity recorded on results.
    pub fn compiler(&self) -> Option<&str> {
        self.compiler.as_deref()
    }

    /// Returns the photo directories.
    pub fn photo_dirs(&self) -> impl Iterator<Item = &str> + Clone {
        self.photo_dirs.iter().map(String::as_str)
    }

    /// Returns true if checksums of `test_name` are waived.
    pub fn is_checksum_waived(&self, test_name: &str) -> bool {
        self.waived.contains(test_name)
    }

    fn command_env(&self, installation: &dyn InstallationInfo) -> CommandEnv {
        let mut env = CommandEnv::new();
        env.set(&self.root_env_var, installation.root_path().as_str());
        env.set("OMP_NUM_THREADS", self.thread_count.to_string());
        for (key, value) in &self.extra_env {
            env.set(key, value);
        }
        env
    }
}

/// A test case and the state of its most recent run.
#[derive(Clone, Debug)]
pub struct TestCase<'a> {
    spec: TestSpec,
    module: TestModule,
    installation: DebugIgnore<&'a dyn InstallationInfo>,
    checksum_waived: bool,
    steps: Vec<VerificationStep>,
    outcome: TestOutcome,
    failure_message: Option<String>,
    started_at: Option<DateTime<FixedOffset>>,
    build_runtime_seconds: Option<f64>,
    restart_runtime_seconds: Option<f64>,
    total_runtime_seconds: Option<f64>,
    thread_count: Option<u32>,
    checksum: Option<String>,
    statistics: Option<RunStatistics>,
    compiler: Option<String>,
}

impl<'a> TestCase<'a> {
    /// Creates a test case that hasn't been run.
    pub fn new(spec: TestSpec, module: TestModule, installation: &'a dyn InstallationInfo) -> Self {
        Self {
            spec,
            module,
            installation: DebugIgnore(installation),
            checksum_waived: false,
            steps: Vec::new(),
            outcome: TestOutcome::NotTested,
            failure_message: None,
            started_at: None,
            build_runtime_seconds: None,
            restart_runtime_seconds: None,
            total_runtime_seconds: None,
            thread_count: None,
            checksum: None,
            statistics: None,
            compiler: None,
        }
    }

    /// Restores a test case's state from a persisted record.
    ///
    /// The record is assumed to have been validated.
    pub fn from_record(
        spec: TestSpec,
        installation: &'a dyn InstallationInfo,
        record: &TestCaseRecord,
    ) -> Self {
        let outcome = match (record.outcome, record.success_type, record.failure_type) {
            (TestOutcomeSummary::Pass, Some(success_type), _) => TestOutcome::Pass(success_type),
            (TestOutcomeSummary::Fail, _, Some(failure_type)) => TestOutcome::Fail(failure_type),
            _ => TestOutcome::NotTested,
        };
        let statistics = record.step_count.map(|steps| RunStatistics {
            runtime_minutes: record.runtime_minutes.unwrap_or_default(),
            retries: record.retry_count.unwrap_or_default(),
            backups: record.backup_count.unwrap_or_default(),
            steps,
            summary_text: record.summary_text.clone(),
        });

        Self {
            outcome,
            failure_message: record.failure_message.clone(),
            started_at: record.started_at,
            build_runtime_seconds: record.build_runtime_seconds,
            restart_runtime_seconds: record.restart_runtime_seconds,
            total_runtime_seconds: record.total_runtime_seconds,
            thread_count: record.thread_count,
            checksum: record.checksum.clone(),
            statistics,
            compiler: record.compiler.clone(),
            ..Self::new(spec, record.module, installation)
        }
    }

    /// Waives cross-machine bit-exactness for this test case: any checksum it adopts is replaced
    /// by [`WAIVED_CHECKSUM`].
    pub fn set_checksum_waived(&mut self, waived: bool) {
        self.checksum_waived = waived;
    }

    /// Returns the name of the test case.
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Returns the module of the test case.
    pub fn module(&self) -> TestModule {
        self.module
    }

    /// Returns the catalogue entry of the test case.
    pub fn spec(&self) -> &TestSpec {
        &self.spec
    }

    /// Returns the working directory of the test case.
    pub fn work_dir(&self) -> Utf8PathBuf {
        self.installation
            .test_suite_path(self.module)
            .join(&self.spec.name)
    }

    /// Returns the outcome of the most recent run.
    pub fn outcome(&self) -> TestOutcome {
        self.outcome
    }

    /// Returns the verification steps performed by the most recent run.
    pub fn steps(&self) -> &[VerificationStep] {
        &self.steps
    }

    /// Returns a human-readable description of the failure, if the test case failed.
    pub fn failure_message(&self) -> Option<&str> {
        self.failure_message.as_deref()
    }

    /// Returns the checksum adopted by the most recent run, if it passed with a final model.
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    /// Returns the wall-clock duration of the run step, in seconds.
    pub fn build_runtime_seconds(&self) -> Option<f64> {
        self.build_runtime_seconds
    }

    /// Returns the wall-clock duration of the restart step, in seconds.
    pub fn restart_runtime_seconds(&self) -> Option<f64> {
        self.restart_runtime_seconds
    }

    /// Returns the wall-clock duration of the whole lifecycle after cleaning, in seconds.
    pub fn total_runtime_seconds(&self) -> Option<f64> {
        self.total_runtime_seconds
    }

    /// Returns the statistics extracted from the combined log.
    pub fn statistics(&self) -> Option<&RunStatistics> {
        self.statistics.as_ref()
    }

    /// Removes everything a previous run left in the working directory.
    ///
    /// Runs `./clean` if the working directory has one, then removes the combined log, the final
    /// model, the result record and all photos. Cleaning an already clean directory is a no-op.
    pub fn clean(&self, settings: &TestCaseSettings) -> Result<(), TestCaseSetupError> {
        let work_dir = self.existing_work_dir()?;
        let env = settings.command_env(*self.installation);
        let command = TestCommand::new(&work_dir, &env);

        if command.has_program("clean") {
            let output = command.run("clean", &[]).map_err(|err| match err {
                TestCaseSetupError::CommandExecFailed { err, .. } => {
                    TestCaseSetupError::CleanExecFailed {
                        name: self.spec.name.clone(),
                        err,
                    }
                }
                other => other,
            })?;
            if !output.status.success() {
                return Err(TestCaseSetupError::CleanFailed {
                    name: self.spec.name.clone(),
                    exit_code: output.status.code(),
                });
            }
        }

        let mut derived = vec![OUT_FILE_NAME, ERR_FILE_NAME, RECORD_FILE_NAME];
        if let Some(final_model) = &self.spec.final_model_name {
            derived.push(final_model.as_str());
        }
        for file_name in derived {
            remove_if_exists(&work_dir.join(file_name))?;
        }
        clear_photos(&work_dir, settings.photo_dirs())?;

        debug!("cleaned {work_dir}");
        Ok(())
    }

    /// Runs the full lifecycle and returns the outcome.
    ///
    /// Any state from a previous run is discarded first.
    pub fn run(&mut self, settings: &TestCaseSettings) -> Result<TestOutcome, TestCaseSetupError> {
        *self = Self {
            checksum_waived: self.checksum_waived,
            ..Self::new(self.spec.clone(), self.module, *self.installation)
        };

        self.clean(settings)?;

        let work_dir = self.work_dir();
        let env = settings.command_env(*self.installation);
        let command = TestCommand::new(&work_dir, &env);
        let log = CombinedLog::new(&work_dir);
        self.thread_count = Some(settings.thread_count());
        self.compiler = settings.compiler().map(ToOwned::to_owned);
        let waived = self.checksum_waived || settings.is_checksum_waived(&self.spec.name);

        info!("{}: starting `{}`", self.module, self.spec.name);
        let total = stopwatch();
        self.started_at = Some(total.start_time().fixed_offset());

        self.verify(&command, &log, settings, &work_dir, waived)?;
        self.total_runtime_seconds = Some(total.snapshot().seconds());

        self.outcome = classify(&self.steps);
        self.failure_message = self.outcome.failure_type().map(|failure_type| {
            failure_message(
                &self.spec.name,
                self.spec.final_model_name.as_deref(),
                failure_type,
            )
        });
        self.statistics = self.extract_statistics(&log);

        match &self.failure_message {
            Some(message) => info!("{}: {message}", self.module),
            None => info!("{}: `{}` passed", self.module, self.spec.name),
        }
        Ok(self.outcome)
    }

    /// Writes the state of the most recent run to the result record in the working directory.
    pub fn save(&self) -> Result<Utf8PathBuf, RecordWriteError> {
        write_record(&self.work_dir(), &self.to_record())
    }

    /// Returns the result record for the most recent run.
    pub fn to_record(&self) -> TestCaseRecord {
        let statistics = self.statistics.as_ref();
        TestCaseRecord {
            outcome: self.outcome.summary(),
            success_type: self.outcome.success_type(),
            failure_type: self.outcome.failure_type(),
            failure_message: self.failure_message.clone(),
            started_at: self.started_at,
            build_runtime_seconds: self.build_runtime_seconds,
            restart_runtime_seconds: self.restart_runtime_seconds,
            total_runtime_seconds: self.total_runtime_seconds,
            thread_count: self.thread_count,
            checksum: self.checksum.clone(),
            step_count: statistics.map(|s| s.steps),
            retry_count: statistics.map(|s| s.retries),
            backup_count: statistics.map(|s| s.backups),
            runtime_minutes: statistics.map(|s| s.runtime_minutes),
            summary_text: statistics.and_then(|s| s.summary_text.clone()),
            compiler: self.compiler.clone(),
            ..TestCaseRecord::not_tested(&self.spec.name, self.module)
        }
    }

    // ---
    // Helper methods
    // ---

    fn existing_work_dir(&self) -> Result<Utf8PathBuf, TestCaseSetupError> {
        let work_dir = self.work_dir();
        if work_dir.is_dir() {
            Ok(work_dir)
        } else {
            Err(TestCaseSetupError::WorkDirMissing {
                name: self.spec.name.clone(),
                work_dir,
            })
        }
    }

    /// Performs the build, run and restart phases, recording each check in `self.steps`.
    ///
    /// Returns early as soon as a check fails.
    fn verify(
        &mut self,
        command: &TestCommand<'_>,
        log: &CombinedLog,
        settings: &TestCaseSettings,
        work_dir: &Utf8Path,
        waived: bool,
    ) -> Result<(), TestCaseSetupError> {
        let name = self.spec.name.clone();

        let build = command.run("mk", &[])?;
        let built = build.status.success();
        self.steps.push(VerificationStep::Build { succeeded: built });
        if !built {
            warn!("{name}: build {}", display_exited_with(build.status));
            debug!(
                "{name}: build output:\n{}{}",
                String::from_utf8_lossy(&build.stdout),
                String::from_utf8_lossy(&build.stderr),
            );
            return Ok(());
        }

        let run_watch = stopwatch();
        let run = command.run("rn", &[])?;
        self.build_runtime_seconds = Some(run_watch.snapshot().seconds());
        if !run.status.success() {
            debug!("{name}: run {}", display_exited_with(run.status));
        }
        let run_output = log.record_phase(Phase::Run, &run)?;

        let found = contains_ignore_case(&run_output, &self.spec.success_string);
        self.steps.push(VerificationStep::RunOutput { found });
        if !found {
            log.append_line(&phase_marker(&name, Phase::Run, false))?;
            return Ok(());
        }

        let Some(final_model) = self.spec.final_model_name.clone() else {
            log.append_line(&phase_marker(&name, Phase::Run, true))?;
            return Ok(());
        };
        let model_path = work_dir.join(&final_model);
        let run_checksum = match file_checksum(&model_path) {
            Ok(checksum) => checksum,
            Err(error) => {
                if error.kind() != io::ErrorKind::NotFound {
                    warn!("{name}: failed to read final model {model_path}: {error}");
                }
                self.steps.push(VerificationStep::FinalModel { present: false });
                log.append_line(&phase_marker(&name, Phase::Run, false))?;
                return Ok(());
            }
        };
        self.steps.push(VerificationStep::FinalModel { present: true });
        log.append_line(&phase_marker(&name, Phase::Run, true))?;

        if self.spec.checkpoint_policy == CheckpointPolicy::None {
            self.checksum = Some(adopt_checksum(run_checksum, waived));
            return Ok(());
        }

        let photo = resolve_photo(
            work_dir,
            settings.photo_dirs(),
            &self.spec.checkpoint_policy,
        )?;
        self.steps.push(VerificationStep::Photo {
            found: photo.is_some(),
        });
        let Some(photo) = photo else {
            debug!(
                "{name}: no photo matches checkpoint `{}`",
                self.spec.checkpoint_policy
            );
            log.append_line(&phase_marker(&name, Phase::Restart, false))?;
            return Ok(());
        };
        debug!("{name}: restarting from {}", photo.path());

        remove_if_exists(&model_path)?;
        let restart_watch = stopwatch();
        let restart = command.run("re", &[photo.file_name()])?;
        self.restart_runtime_seconds = Some(restart_watch.snapshot().seconds());
        if !restart.status.success() {
            warn!("{name}: restart {}", display_exited_with(restart.status));
        }
        log.record_phase(Phase::Restart, &restart)?;

        let (comparison, restart_checksum) = match file_checksum(&model_path) {
            Ok(checksum) if checksum == run_checksum => (ChecksumComparison::Match, Some(checksum)),
            Ok(_) => (ChecksumComparison::Mismatch, None),
            Err(error) => {
                warn!("{name}: failed to checksum {model_path} after restart: {error}");
                (ChecksumComparison::Unavailable, None)
            }
        };
        self.steps
            .push(VerificationStep::RestartChecksum(comparison));
        log.append_line(&phase_marker(
            &name,
            Phase::Restart,
            comparison == ChecksumComparison::Match,
        ))?;

        self.checksum = restart_checksum.map(|checksum| adopt_checksum(checksum, waived));
        Ok(())
    }

    fn extract_statistics(&self, log: &CombinedLog) -> Option<RunStatistics> {
        match std::fs::read(log.path()) {
            Ok(contents) => {
                let stats =
                    RunStatistics::extract(&String::from_utf8_lossy(&contents), &self.spec.name);
                if stats.summary_text.is_none() {
                    debug!("{}: no summary lines in {}", self.spec.name, log.path());
                }
                Some(stats)
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                warn!("{}: no combined log, statistics unavailable", self.spec.name);
                None
            }
            Err(error) => {
                warn!(
                    "{}: failed to read {} for statistics: {error}",
                    self.spec.name,
                    log.path()
                );
                None
            }
        }
    }
}

fn adopt_checksum(checksum: String, waived: bool) -> String {
    if waived {
        WAIVED_CHECKSUM.to_owned()
    } else {
        checksum
    }
}

fn contains_ignore_case(haystack: &[u8], needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    String::from_utf8_lossy(haystack)
        .to_lowercase()
        .contains(&needle.to_lowercase())
}

fn remove_if_exists(path: &Utf8Path) -> Result<(), TestCaseSetupError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(TestCaseSetupError::CleanRemoveFailed {
            path: path.to_owned(),
            err,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(b"the Good Model was produced", "good model", true; "case insensitive")]
    #[test_case(b"nothing here", "good model", false; "absent")]
    #[test_case(b"", "", true; "empty success string")]
    fn success_string_search(haystack: &[u8], needle: &str, expected: bool) {
        assert_eq!(contains_ignore_case(haystack, needle), expected);
    }

    #[test]
    fn waived_checksum_is_sentinel() {
        assert_eq!(adopt_checksum("abc".to_owned(), false), "abc");
        assert_eq!(adopt_checksum("abc".to_owned(), true), WAIVED_CHECKSUM);
    }
}

#[cfg(all(test, unix))]
mod lifecycle_tests {
    use super::*;
    use crate::{checksum::file_checksum, config::SimtestConfig, installation::Installation};
    use camino_tempfile::Utf8TempDir;
    use pretty_assertions::assert_eq;
    use simtest_metadata::{FailureType, SuccessType};
    use std::os::unix::fs::PermissionsExt;

    struct Fixture {
        _root: Utf8TempDir,
        installation: Installation,
        settings: TestCaseSettings,
    }

    impl Fixture {
        fn new() -> Self {
            let root = camino_tempfile::tempdir().unwrap();
            let installation = Installation::new(root.path(), Some("r1".to_owned())).unwrap();
            let config = SimtestConfig::default_config(root.path());
            let settings = TestCaseSettings::from_profile(&config.profile("default").unwrap())
                .with_thread_count(2);
            Self {
                _root: root,
                installation,
                settings,
            }
        }

        fn test_case(&self, spec: TestSpec) -> TestCase<'_> {
            let work_dir = self
                .installation
                .test_suite_path(TestModule::Star)
                .join(&spec.name);
            std::fs::create_dir_all(&work_dir).unwrap();
            write_script(&work_dir, "mk", "exit 0");
            TestCase::new(spec, TestModule::Star, &self.installation)
        }
    }

    fn write_script(dir: &Utf8Path, name: &str, body: &str) {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn spec(
        name: &str,
        success: &str,
        final_model: Option<&str>,
        checkpoint: CheckpointPolicy,
    ) -> TestSpec {
        TestSpec {
            name: name.to_owned(),
            success_string: success.to_owned(),
            final_model_name: final_model.map(ToOwned::to_owned),
            checkpoint_policy: checkpoint,
        }
    }

    fn assert_invariants(test_case: &TestCase<'_>) {
        let record = test_case.to_record();
        record.validate().expect("record is consistent");
        assert_eq!(
            record.success_type.is_some(),
            record.outcome == TestOutcomeSummary::Pass
        );
        assert_eq!(
            record.failure_type.is_some(),
            record.outcome == TestOutcomeSummary::Fail
        );
    }

    #[test]
    fn missing_combined_log_means_no_statistics() {
        let fixture = Fixture::new();
        let test_case = fixture.test_case(spec("no_log", "", None, CheckpointPolicy::None));
        let log = CombinedLog::new(&test_case.work_dir());
        assert_eq!(test_case.extract_statistics(&log), None);

        std::fs::write(log.path(), "no summary here\n").unwrap();
        assert_eq!(
            test_case.extract_statistics(&log),
            Some(RunStatistics::default())
        );
    }

    #[test]
    fn run_only_pass_without_final_model() {
        let fixture = Fixture::new();
        let mut test_case = fixture.test_case(spec(
            "good_model",
            "good model",
            None,
            CheckpointPolicy::None,
        ));
        write_script(
            &test_case.work_dir(),
            "rn",
            "echo 'the good model was produced'",
        );

        let outcome = test_case.run(&fixture.settings).unwrap();
        assert_eq!(outcome, TestOutcome::Pass(SuccessType::RunTestString));
        assert_eq!(test_case.checksum(), None);
        assert!(test_case.build_runtime_seconds().is_some());
        assert!(test_case.total_runtime_seconds().is_some());
        assert_eq!(test_case.restart_runtime_seconds(), None);
        assert_invariants(&test_case);

        let log = std::fs::read_to_string(test_case.work_dir().join(OUT_FILE_NAME)).unwrap();
        assert_eq!(log, "the good model was produced\nPASS good_model run\n");
    }

    #[test]
    fn final_model_checksum_is_adopted() {
        let fixture = Fixture::new();
        let mut test_case = fixture.test_case(spec(
            "with_model",
            "",
            Some("final.mod"),
            CheckpointPolicy::None,
        ));
        let work_dir = test_case.work_dir();
        write_script(&work_dir, "rn", "echo model-contents > final.mod");

        let outcome = test_case.run(&fixture.settings).unwrap();
        assert_eq!(outcome, TestOutcome::Pass(SuccessType::RunTestString));
        let expected = file_checksum(&work_dir.join("final.mod")).unwrap();
        assert_eq!(test_case.checksum(), Some(expected.as_str()));
        assert_invariants(&test_case);
    }

    #[test]
    fn missing_final_model_fails() {
        let fixture = Fixture::new();
        let mut test_case = fixture.test_case(spec(
            "no_model",
            "done",
            Some("final.mod"),
            CheckpointPolicy::None,
        ));
        write_script(&test_case.work_dir(), "rn", "echo done");

        let outcome = test_case.run(&fixture.settings).unwrap();
        assert_eq!(outcome, TestOutcome::Fail(FailureType::FinalModelMissing));
        assert_eq!(test_case.checksum(), None);
        assert_eq!(
            test_case.failure_message(),
            Some("`no_model` run failed: `final.mod` was not produced")
        );
        assert_invariants(&test_case);
    }

    #[test]
    fn missing_success_string_fails_before_model_check() {
        let fixture = Fixture::new();
        let mut test_case = fixture.test_case(spec(
            "wrong_text",
            "termination code: max_age",
            Some("final.mod"),
            CheckpointPolicy::Auto,
        ));
        write_script(
            &test_case.work_dir(),
            "rn",
            "echo 'termination code: min_timestep'; echo x > final.mod",
        );

        let outcome = test_case.run(&fixture.settings).unwrap();
        assert_eq!(outcome, TestOutcome::Fail(FailureType::RunTestString));
        assert_eq!(
            test_case.steps(),
            [
                VerificationStep::Build { succeeded: true },
                VerificationStep::RunOutput { found: false },
            ]
        );
        assert_invariants(&test_case);
    }

    #[test]
    fn build_failure_is_compilation() {
        let fixture = Fixture::new();
        let mut test_case = fixture.test_case(spec("broken", "", None, CheckpointPolicy::None));
        write_script(&test_case.work_dir(), "mk", "echo 'syntax error' >&2; exit 2");

        let outcome = test_case.run(&fixture.settings).unwrap();
        assert_eq!(outcome, TestOutcome::Fail(FailureType::Compilation));
        assert_eq!(test_case.build_runtime_seconds(), None);
        assert_eq!(test_case.statistics(), None);
        assert_invariants(&test_case);
    }

    #[test]
    fn auto_restart_from_oldest_of_two_photos_detects_diff() {
        let fixture = Fixture::new();
        let mut test_case = fixture.test_case(spec(
            "restart_diff",
            "",
            Some("final.mod"),
            CheckpointPolicy::Auto,
        ));
        let work_dir = test_case.work_dir();
        write_script(
            &work_dir,
            "rn",
            "mkdir -p photos && echo a > photos/x100 && sleep 0.05 && echo b > photos/x200 \
             && echo original > final.mod",
        );
        write_script(&work_dir, "re", "echo \"restarted from $1\"; echo different > final.mod");

        let outcome = test_case.run(&fixture.settings).unwrap();
        assert_eq!(outcome, TestOutcome::Fail(FailureType::PhotoDiff));
        assert_eq!(test_case.checksum(), None);
        assert!(test_case.restart_runtime_seconds().is_some());
        assert_invariants(&test_case);

        let log = std::fs::read_to_string(work_dir.join(OUT_FILE_NAME)).unwrap();
        assert!(log.contains("restarted from x100\n"), "log: {log}");
        assert!(log.ends_with("FAIL restart_diff restart\n"), "log: {log}");
    }

    #[test]
    fn restart_match_passes_with_run_checksum() {
        let fixture = Fixture::new();
        let mut test_case = fixture.test_case(spec(
            "restart_ok",
            "",
            Some("final.mod"),
            CheckpointPolicy::Named("x100".to_owned()),
        ));
        let work_dir = test_case.work_dir();
        write_script(
            &work_dir,
            "rn",
            "mkdir -p photos1 && touch photos1/x100 && echo same > final.mod",
        );
        write_script(&work_dir, "re", "echo same > final.mod");

        let outcome = test_case.run(&fixture.settings).unwrap();
        assert_eq!(outcome, TestOutcome::Pass(SuccessType::PhotoChecksum));
        let expected = file_checksum(&work_dir.join("final.mod")).unwrap();
        assert_eq!(test_case.checksum(), Some(expected.as_str()));
        assert_invariants(&test_case);

        test_case.set_checksum_waived(true);
        let outcome = test_case.run(&fixture.settings).unwrap();
        assert_eq!(outcome, TestOutcome::Pass(SuccessType::PhotoChecksum));
        assert_eq!(test_case.checksum(), Some(WAIVED_CHECKSUM));
    }

    #[test]
    fn missing_photo_fails() {
        let fixture = Fixture::new();
        let mut test_case = fixture.test_case(spec(
            "no_photo",
            "",
            Some("final.mod"),
            CheckpointPolicy::NumericIndex(500),
        ));
        write_script(&test_case.work_dir(), "rn", "echo m > final.mod");

        let outcome = test_case.run(&fixture.settings).unwrap();
        assert_eq!(outcome, TestOutcome::Fail(FailureType::PhotoFileMissing));
        assert_invariants(&test_case);
    }

    #[test]
    fn regenerated_model_missing_is_photo_checksum() {
        let fixture = Fixture::new();
        let mut test_case = fixture.test_case(spec(
            "restart_lost",
            "",
            Some("final.mod"),
            CheckpointPolicy::Auto,
        ));
        let work_dir = test_case.work_dir();
        write_script(
            &work_dir,
            "rn",
            "mkdir -p photos && touch photos/x010 && echo m > final.mod",
        );
        write_script(&work_dir, "re", "exit 1");

        let outcome = test_case.run(&fixture.settings).unwrap();
        assert_eq!(outcome, TestOutcome::Fail(FailureType::PhotoChecksum));
        assert_invariants(&test_case);
    }

    #[test]
    fn statistics_come_from_the_run_phase() {
        let fixture = Fixture::new();
        let mut test_case = fixture.test_case(spec(
            "stats",
            "",
            Some("final.mod"),
            CheckpointPolicy::Auto,
        ));
        let work_dir = test_case.work_dir();
        write_script(
            &work_dir,
            "rn",
            "echo 'runtime (minutes), retries, backups, steps   1.5   2   1   100'\n\
             echo 'runtime (minutes), retries, backups, steps   0.5   1   0   50'\n\
             mkdir -p photos && touch photos/x100 && echo m > final.mod",
        );
        write_script(
            &work_dir,
            "re",
            "echo 'runtime (minutes), retries, backups, steps   9.0   9   9   999'\n\
             echo m > final.mod",
        );

        test_case.run(&fixture.settings).unwrap();
        let stats = test_case.statistics().expect("log exists");
        assert_eq!(stats.steps, 150);
        assert_eq!(stats.retries, 3);
        assert_eq!(stats.backups, 1);
        assert_eq!(stats.runtime_minutes, 2.0);

        let record = test_case.to_record();
        assert_eq!(record.step_count, Some(150));
        assert_eq!(record.thread_count, Some(2));
    }

    #[test]
    fn environment_is_passed_explicitly() {
        let fixture = Fixture::new();
        let mut test_case = fixture.test_case(spec(
            "env",
            "threads=2",
            None,
            CheckpointPolicy::None,
        ));
        write_script(
            &test_case.work_dir(),
            "rn",
            "echo \"root=$SIM_DIR threads=$OMP_NUM_THREADS\"",
        );

        test_case.run(&fixture.settings).unwrap();
        let log = std::fs::read_to_string(test_case.work_dir().join(OUT_FILE_NAME)).unwrap();
        assert!(
            log.starts_with(&format!(
                "root={} threads=2",
                fixture.installation.root_path()
            )),
            "log: {log}"
        );
    }

    #[test]
    fn clean_is_idempotent() {
        let fixture = Fixture::new();
        let test_case = fixture.test_case(spec(
            "cleanup",
            "",
            Some("final.mod"),
            CheckpointPolicy::Auto,
        ));
        let work_dir = test_case.work_dir();
        for file in [OUT_FILE_NAME, ERR_FILE_NAME, RECORD_FILE_NAME, "final.mod"] {
            std::fs::write(work_dir.join(file), b"stale").unwrap();
        }
        std::fs::create_dir_all(work_dir.join("photos")).unwrap();
        std::fs::write(work_dir.join("photos/x100"), b"stale").unwrap();

        let listing = |dir: &Utf8Path| {
            let mut names: Vec<_> = walk(dir);
            names.sort();
            names
        };

        test_case.clean(&fixture.settings).unwrap();
        let once = listing(&work_dir);
        test_case.clean(&fixture.settings).unwrap();
        let twice = listing(&work_dir);

        assert_eq!(once, twice);
        assert_eq!(once, ["mk", "photos"]);
    }

    #[test]
    fn failing_clean_script_aborts() {
        let fixture = Fixture::new();
        let mut test_case = fixture.test_case(spec("dirty", "", None, CheckpointPolicy::None));
        write_script(&test_case.work_dir(), "clean", "exit 3");

        let err = test_case.run(&fixture.settings).unwrap_err();
        assert!(
            matches!(err, TestCaseSetupError::CleanFailed { exit_code: Some(3), .. }),
            "unexpected error: {err:?}"
        );
        assert_eq!(test_case.outcome(), TestOutcome::NotTested);
    }

    #[test]
    fn missing_work_dir_is_fatal() {
        let fixture = Fixture::new();
        let mut test_case = TestCase::new(
            spec("nowhere", "", None, CheckpointPolicy::None),
            TestModule::Binary,
            &fixture.installation,
        );
        let err = test_case.run(&fixture.settings).unwrap_err();
        assert!(matches!(err, TestCaseSetupError::WorkDirMissing { .. }));
    }

    #[test]
    fn saved_record_restores_state() {
        let fixture = Fixture::new();
        let spec = spec("saved", "ok", None, CheckpointPolicy::None);
        let mut test_case = fixture.test_case(spec.clone());
        write_script(&test_case.work_dir(), "rn", "echo ok");
        test_case.run(&fixture.settings).unwrap();
        test_case.save().unwrap();

        let record = crate::record::read_record(&test_case.work_dir())
            .unwrap()
            .expect("record was written");
        assert_eq!(record, test_case.to_record());

        let restored = TestCase::from_record(spec, &fixture.installation, &record);
        assert_eq!(restored.outcome(), test_case.outcome());
        assert_eq!(restored.to_record(), record);
    }

    fn walk(dir: &Utf8Path) -> Vec<String> {
        dir.read_dir_utf8()
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_owned())
            .collect()
    }
}
