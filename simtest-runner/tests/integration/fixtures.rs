// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use indoc::indoc;
use simtest_metadata::TestModule;
use simtest_runner::catalog::CATALOG_FILE_NAME;
use std::os::unix::fs::PermissionsExt;

pub(crate) const STAR_CATALOG: &str = indoc! {r#"
    #!/bin/bash
    # sourced by each_test_run

    do_one good_model "the good model" skip skip
    do_one restart_ok "termination code: max_age" "final.mod" auto
    do_one broken_build "never printed" skip skip
"#};

pub(crate) const BINARY_CATALOG: &str = indoc! {r#"
    do_one evolve_both_stars "termination code: max_model_number" "final.mod" skip
"#};

/// A fake installation tree with a compiled lib directory and one test suite per module.
pub(crate) struct FakeInstallation {
    root: Utf8TempDir,
}

impl FakeInstallation {
    pub(crate) fn new() -> Self {
        let root = camino_tempfile::tempdir().expect("created temp dir");
        let this = Self { root };

        std::fs::create_dir_all(this.root().join("lib")).unwrap();
        std::fs::write(this.root().join("lib/libstar.a"), b"").unwrap();
        std::fs::create_dir_all(this.root().join("data")).unwrap();
        std::fs::write(this.root().join("data/version_number"), "15140\n").unwrap();

        this.write_catalog(TestModule::Star, STAR_CATALOG);
        this.write_catalog(TestModule::Binary, BINARY_CATALOG);
        this.write_catalog(TestModule::Astero, "");

        let good = this.work_dir(TestModule::Star, "good_model");
        write_script(&good, "mk", "exit 0");
        write_script(&good, "rn", "echo 'so the Good Model was produced'");

        let restart = this.work_dir(TestModule::Star, "restart_ok");
        write_script(&restart, "mk", "exit 0");
        write_script(
            &restart,
            "rn",
            indoc! {"
                mkdir -p photos
                for n in 10 20 30 40; do echo $n > photos/x0$n; sleep 0.02; done
                echo 'runtime (minutes), retries, backups, steps   3.25   4   2   400'
                echo 'termination code: max_age'
                echo converged > final.mod
            "},
        );
        write_script(
            &restart,
            "re",
            indoc! {r#"
                echo "restart from $1"
                echo converged > final.mod
            "#},
        );

        let broken = this.work_dir(TestModule::Star, "broken_build");
        write_script(&broken, "mk", "echo 'undefined reference' >&2; exit 1");

        let binary = this.work_dir(TestModule::Binary, "evolve_both_stars");
        write_script(&binary, "mk", "exit 0");
        write_script(
            &binary,
            "rn",
            "echo 'termination code: max_model_number'; echo binary > final.mod",
        );

        this
    }

    pub(crate) fn root(&self) -> &Utf8Path {
        self.root.path()
    }

    pub(crate) fn work_dir(&self, module: TestModule, name: &str) -> Utf8PathBuf {
        let dir = self.test_suite(module).join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn test_suite(&self, module: TestModule) -> Utf8PathBuf {
        self.root().join(module.as_str()).join("test_suite")
    }

    fn write_catalog(&self, module: TestModule, contents: &str) {
        let test_suite = self.test_suite(module);
        std::fs::create_dir_all(&test_suite).unwrap();
        std::fs::write(test_suite.join(CATALOG_FILE_NAME), contents).unwrap();
    }
}

pub(crate) fn write_script(dir: &Utf8Path, name: &str, body: &str) {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}
