// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::FakeInstallation;
use color_eyre::eyre::Result;
use indoc::indoc;
use pretty_assertions::assert_eq;
use simtest_metadata::{
    FailureType, ModuleSelector, SuccessType, TestModule, TestOutcomeSummary,
};
use simtest_runner::{
    catalog::{CatalogSet, TestSelector},
    config::SimtestConfig,
    installation::{Installation, InstallationInfo},
    outcome::TestOutcome,
    record::read_record,
    submission::SubmissionBuilder,
    test_case::{TestCase, TestCaseSettings},
};

fn settings_for(fixture: &FakeInstallation, profile: &str) -> Result<TestCaseSettings> {
    let config_file = fixture.root().join("simtest.toml");
    std::fs::write(
        &config_file,
        indoc! {r#"
            [profile.default]
            threads = 2

            [profile.ci]
            extra-env = ["SIMTEST_CI=1"]
        "#},
    )?;
    let config = SimtestConfig::from_sources(fixture.root(), Some(&config_file))?;
    Ok(TestCaseSettings::from_profile(&config.profile(profile)?))
}

#[test]
fn catalog_spans_all_modules() -> Result<()> {
    let fixture = FakeInstallation::new();
    let installation = Installation::new(fixture.root(), None)?;
    assert_eq!(installation.revision(), "15140");
    assert!(installation.is_installed());

    let catalogs = CatalogSet::load(ModuleSelector::All, &installation)?;
    let listed: Vec<_> = catalogs
        .iter()
        .map(|(index, module, spec)| (index, module, spec.name.as_str()))
        .collect();
    assert_eq!(
        listed,
        [
            (1, TestModule::Star, "good_model"),
            (2, TestModule::Star, "restart_ok"),
            (3, TestModule::Star, "broken_build"),
            (4, TestModule::Binary, "evolve_both_stars"),
        ]
    );

    let (module, spec) = catalogs.find(&TestSelector::Index(4))?;
    assert_eq!(module, TestModule::Binary);
    assert_eq!(spec.final_model_name.as_deref(), Some("final.mod"));
    assert!(catalogs.find(&TestSelector::Index(5)).is_err());
    Ok(())
}

#[test]
fn run_selected_tests_and_submit() -> Result<()> {
    let fixture = FakeInstallation::new();
    let installation = Installation::new(fixture.root(), Some("r9999".to_owned()))?;
    let settings = settings_for(&fixture, "ci")?;
    assert_eq!(settings.thread_count(), 2);

    let catalogs = CatalogSet::load(ModuleSelector::One(TestModule::Star), &installation)?;
    let mut outcomes = Vec::new();
    for (_, module, spec) in catalogs.iter() {
        let mut test_case = TestCase::new(spec.clone(), module, &installation);
        let outcome = test_case.run(&settings)?;
        test_case.save()?;
        outcomes.push((spec.name.clone(), outcome));
    }
    assert_eq!(
        outcomes,
        [
            (
                "good_model".to_owned(),
                TestOutcome::Pass(SuccessType::RunTestString)
            ),
            (
                "restart_ok".to_owned(),
                TestOutcome::Pass(SuccessType::PhotoChecksum)
            ),
            (
                "broken_build".to_owned(),
                TestOutcome::Fail(FailureType::Compilation)
            ),
        ]
    );

    let restart_dir = fixture.work_dir(TestModule::Star, "restart_ok");
    let record = read_record(&restart_dir)?.expect("record was saved");
    assert_eq!(record.step_count, Some(400));
    assert_eq!(record.retry_count, Some(4));
    assert_eq!(record.thread_count, Some(2));
    assert!(record.checksum.is_some());
    let log = std::fs::read_to_string(restart_dir.join("out.txt"))?;
    assert!(log.contains("restart from x020"), "log: {log}");

    // Binary was never run, so it's submitted as not tested.
    let all = CatalogSet::load(ModuleSelector::All, &installation)?;
    let mut builder = SubmissionBuilder::new(&installation, Some("gfortran".to_owned()));
    for (_, module, spec) in all.iter() {
        builder.add_persisted(module, spec)?;
    }
    let submission = builder.build()?;
    assert_eq!(submission.counts(), (2, 1));
    assert_eq!(
        submission.test_cases[3].outcome,
        TestOutcomeSummary::NotTested
    );

    let json: serde_json::Value = serde_json::from_str(&submission.to_json()?)?;
    assert_eq!(json["revision"], "r9999");
    assert_eq!(json["install-success"], true);
    assert_eq!(json["test-cases"].as_array().map(Vec::len), Some(4));
    assert_eq!(json["test-cases"][0]["compiler"], "gfortran");
    Ok(())
}

#[test]
fn clean_resets_a_previous_run() -> Result<()> {
    let fixture = FakeInstallation::new();
    let installation = Installation::new(fixture.root(), None)?;
    let settings = settings_for(&fixture, "default")?;
    let catalogs = CatalogSet::load(ModuleSelector::One(TestModule::Binary), &installation)?;
    let (module, spec) = catalogs.find(&TestSelector::Name("evolve_both_stars".to_owned()))?;

    let mut test_case = TestCase::new(spec.clone(), module, &installation);
    assert_eq!(
        test_case.run(&settings)?,
        TestOutcome::Pass(SuccessType::RunTestString)
    );
    test_case.save()?;
    let work_dir = test_case.work_dir();
    assert!(work_dir.join("final.mod").exists());

    test_case.clean(&settings)?;
    assert!(!work_dir.join("final.mod").exists());
    assert!(!work_dir.join("out.txt").exists());
    assert_eq!(read_record(&work_dir)?, None);
    Ok(())
}
