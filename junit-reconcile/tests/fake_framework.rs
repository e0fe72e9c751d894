// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs the `junit-reconcile` binary against a shell script standing in for the test framework.

#![cfg(unix)]

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use indoc::indoc;
use junit_model::{StatusKind, TestCounts, TestSuite};
use junit_reconcile::{exit_codes::ReconcileExitCode, reconcile::RUN_FAILURE_MESSAGE};
use pretty_assertions::assert_eq;

// Accepts the framework command line, copies $FAKE_REPORT to the --out path if set and exits
// with $FAKE_EXIT.
static FAKE_FRAMEWORK: &str = indoc! {r#"
    out=
    while [ $# -gt 0 ]; do
      case "$1" in
        --out) out="$2"; shift 2 ;;
        *) shift ;;
      esac
    done
    echo "fake framework output"
    if [ -n "$FAKE_REPORT" ]; then
      cp "$FAKE_REPORT" "$out"
    fi
    exit "${FAKE_EXIT:-0}"
"#};

static PASS_1_PASS_2: &str = indoc! {r#"
    <?xml version="1.0" encoding="UTF-8"?>
    <testsuite name="rspec" tests="2" skipped="0" failures="0" errors="0" time="0.003" timestamp="2017-10-18T09:37:04+00:00" hostname="ci-host">
      <properties>
        <property name="seed" value="4242"/>
      </properties>
      <testcase classname="spec.pass_1" name="pass 1 works" file="./spec/pass_1.t" time="0.001"/>
      <testcase classname="spec.pass_2" name="pass 2 works" file="./spec/pass_2.t" time="0.002"/>
    </testsuite>
"#};

static A_PASSED_FAIL_FAILED: &str = indoc! {r#"
    <?xml version="1.0" encoding="UTF-8"?>
    <testsuite name="rspec" tests="2" skipped="0" failures="1" errors="0" time="0.003">
      <properties/>
      <testcase classname="spec.a" name="a works" file="./spec/a.t" time="0.001"/>
      <testcase classname="spec.fail" name="fail breaks" file="./spec/fail.t" time="0.002">
        <failure message="expected: 1 got: 2" type="RSpec::Expectations::ExpectationNotMetError">expected: 1 got: 2</failure>
      </testcase>
    </testsuite>
"#};

const REPORT_ID: &str = "1";

const FAKE_FRAMEWORK_ARGS: &str = "fake-framework.sh";

struct Workspace {
    dir: Utf8TempDir,
}

struct Outcome {
    exit_code: i32,
    stdout: String,
    stderr: String,
}

impl Workspace {
    fn new(spec_files: &[&str]) -> Self {
        let dir = Utf8TempDir::new().expect("created temp dir");
        fs_err::write(dir.path().join("fake-framework.sh"), FAKE_FRAMEWORK)
            .expect("wrote fake framework");
        for spec_file in spec_files {
            let path = dir.path().join(spec_file);
            fs_err::create_dir_all(path.parent().expect("spec file has a parent"))
                .expect("created spec dir");
            fs_err::write(&path, "").expect("wrote spec file");
        }
        Self { dir }
    }

    fn path(&self) -> &Utf8Path {
        self.dir.path()
    }

    fn write_fixture(&self, name: &str, contents: &str) -> Utf8PathBuf {
        let path = self.path().join(name);
        fs_err::write(&path, contents).expect("wrote fixture");
        path
    }

    fn report_path(&self) -> Utf8PathBuf {
        self.path()
            .join("reports")
            .join(format!("{REPORT_ID}-rspec.xml"))
    }

    fn expression(
        &self,
        framework: &str,
        framework_args: &str,
        tests: &[&str],
        report: Option<&Utf8Path>,
        exit_code: i32,
    ) -> duct::Expression {
        let mut args = vec![
            "--color",
            "never",
            "--framework",
            framework,
            "--framework-args",
            framework_args,
            "--reports-dir",
            "reports",
            "--report-pattern",
            "%s-rspec.xml",
            "--report-id",
            REPORT_ID,
        ];
        args.extend(tests);

        duct::cmd(env!("CARGO_BIN_EXE_junit-reconcile"), args)
            .dir(self.path())
            .env("FAKE_REPORT", report.map_or("", |path| path.as_str()))
            .env("FAKE_EXIT", exit_code.to_string())
            .env_remove("TDDIUM_REPO_ROOT")
            .env_remove("TDDIUM_SESSION_ID")
            .env_remove("JUNIT_RECONCILE_LOG")
            .stdout_capture()
            .stderr_capture()
            .unchecked()
    }

    fn run(&self, tests: &[&str], report: Option<&Utf8Path>, exit_code: i32) -> Outcome {
        run_expression(self.expression("sh", FAKE_FRAMEWORK_ARGS, tests, report, exit_code))
    }

    fn final_report(&self) -> TestSuite {
        let bytes = fs_err::read(self.report_path()).expect("final report was written");
        TestSuite::parse(&bytes).expect("final report is valid")
    }
}

fn run_expression(expression: duct::Expression) -> Outcome {
    let output = expression.run().expect("junit-reconcile ran");
    Outcome {
        exit_code: output.status.code().expect("exited normally"),
        stdout: String::from_utf8(output.stdout).expect("stdout is UTF-8"),
        stderr: String::from_utf8(output.stderr).expect("stderr is UTF-8"),
    }
}

fn kinds(suite: &TestSuite) -> Vec<(&str, StatusKind)> {
    suite
        .test_cases
        .iter()
        .map(|test_case| {
            (
                test_case.file.as_deref().unwrap_or_default(),
                test_case.status.kind(),
            )
        })
        .collect()
}

#[test]
fn passing_run_keeps_report() {
    let workspace = Workspace::new(&["spec/pass_1.t", "spec/pass_2.t"]);
    let fixture = workspace.write_fixture("pass.xml", PASS_1_PASS_2);

    let outcome = workspace.run(&["spec/pass_1.t", "spec/pass_2.t"], Some(&fixture), 0);
    assert_eq!(
        outcome.exit_code,
        ReconcileExitCode::OK,
        "stderr: {}",
        outcome.stderr
    );
    assert!(
        outcome.stdout.contains("fake framework output"),
        "framework stdout is echoed: {}",
        outcome.stdout
    );

    let suite = workspace.final_report();
    assert_eq!(
        suite.counts(),
        TestCounts {
            tests: 2,
            skipped: 0,
            failures: 0,
            errors: 0,
        }
    );
    assert_eq!(
        suite.property("seed").map(|p| p.value.as_str()),
        Some("4242")
    );
    let command = suite.property("command").expect("command is recorded");
    assert!(
        command
            .value
            .starts_with("sh fake-framework.sh --format RspecJunitFormatter --out "),
        "{}",
        command.value
    );
    assert!(
        command.value.ends_with(" spec/pass_1.t spec/pass_2.t"),
        "{}",
        command.value
    );
}

#[test]
fn syntax_error_marks_file_errored() {
    let workspace = Workspace::new(&["spec/bad_syntax.t"]);

    let outcome = workspace.run(&["spec/bad_syntax.t"], None, 1);
    assert_eq!(outcome.exit_code, 1, "stderr: {}", outcome.stderr);

    let suite = workspace.final_report();
    assert_eq!(
        suite.counts(),
        TestCounts {
            tests: 1,
            skipped: 0,
            failures: 0,
            errors: 1,
        }
    );
    let errored = &suite.test_cases[0];
    assert_eq!(errored.name, "ERROR: spec/bad_syntax.t");
    assert_eq!(errored.classname.as_deref(), Some("spec.bad_syntax"));
    assert_eq!(errored.status.message(), Some(RUN_FAILURE_MESSAGE));
    let detail = errored.system_out.as_ref().expect("detail is recorded");
    assert!(
        detail.as_str().contains("fake framework output"),
        "{}",
        detail.as_str()
    );
    assert_eq!(
        suite.property("generated_by").map(|p| p.value.as_str()),
        Some("junit-reconcile")
    );
}

#[test]
fn partial_report_marks_missing_file_skipped() {
    let files = ["spec/a.t", "spec/fail.t", "spec/skip.t"];
    let workspace = Workspace::new(&files);
    let fixture = workspace.write_fixture("partial.xml", A_PASSED_FAIL_FAILED);

    let outcome = workspace.run(&files, Some(&fixture), 1);
    assert_eq!(outcome.exit_code, 1, "stderr: {}", outcome.stderr);

    let suite = workspace.final_report();
    assert_eq!(
        suite.counts(),
        TestCounts {
            tests: 3,
            skipped: 1,
            failures: 1,
            errors: 0,
        }
    );
    assert_eq!(
        kinds(&suite),
        vec![
            ("./spec/a.t", StatusKind::Passed),
            ("./spec/fail.t", StatusKind::Failed),
            ("./spec/skip.t", StatusKind::Skipped),
        ]
    );
}

#[test]
fn missing_framework_still_writes_report() {
    let workspace = Workspace::new(&["spec/a.t", "spec/b.t"]);

    let outcome = run_expression(workspace.expression(
        "/nonexistent/junit-reconcile-framework",
        FAKE_FRAMEWORK_ARGS,
        &["spec/a.t", "spec/b.t"],
        None,
        0,
    ));
    assert_eq!(
        outcome.exit_code,
        ReconcileExitCode::FRAMEWORK_EXEC_FAILED,
        "stderr: {}",
        outcome.stderr
    );

    let suite = workspace.final_report();
    assert_eq!(suite.errors, 2);
    assert_eq!(suite.tests, 2);
}

#[test]
fn unbalanced_framework_args_still_write_report() {
    let workspace = Workspace::new(&["spec/a.t"]);

    let outcome = run_expression(workspace.expression(
        "sh",
        "fake-framework.sh --tag 'unterminated",
        &["spec/a.t"],
        None,
        0,
    ));
    assert_eq!(
        outcome.exit_code,
        ReconcileExitCode::FRAMEWORK_EXEC_FAILED,
        "stderr: {}",
        outcome.stderr
    );

    let suite = workspace.final_report();
    assert_eq!(suite.tests, 1);
    assert_eq!(suite.errors, 1);
    let errored = &suite.test_cases[0];
    assert_eq!(errored.name, "ERROR: spec/a.t");
    let detail = errored.system_out.as_ref().expect("detail is recorded");
    assert!(
        detail
            .as_str()
            .contains("failed to parse framework arguments"),
        "{}",
        detail.as_str()
    );
    let command = suite.property("command").expect("command is recorded");
    assert_eq!(
        command.value,
        "sh fake-framework.sh --tag 'unterminated --format RspecJunitFormatter spec/a.t"
    );
}

#[test]
fn unusable_temp_dir_still_writes_report() {
    let workspace = Workspace::new(&["spec/a.t", "spec/b.t"]);

    let outcome = run_expression(
        workspace
            .expression(
                "sh",
                FAKE_FRAMEWORK_ARGS,
                &["spec/a.t", "spec/b.t"],
                None,
                0,
            )
            .env("TMPDIR", workspace.path().join("no-such-dir").as_str()),
    );
    assert_eq!(
        outcome.exit_code,
        ReconcileExitCode::FRAMEWORK_EXEC_FAILED,
        "stderr: {}",
        outcome.stderr
    );

    let suite = workspace.final_report();
    assert_eq!(suite.tests, 2);
    assert_eq!(suite.errors, 2);
}

#[test]
fn missing_test_file_is_rejected() {
    let workspace = Workspace::new(&["spec/a.t"]);

    let outcome = workspace.run(&["spec/a.t", "spec/gone.t"], None, 0);
    assert_eq!(outcome.exit_code, ReconcileExitCode::INVALID_TEST_FILE);
    assert!(outcome.stderr.contains("spec/gone.t"), "{}", outcome.stderr);
    assert!(!workspace.report_path().exists(), "no report is written");
}

#[test]
fn no_test_files_is_rejected() {
    let workspace = Workspace::new(&[]);

    let outcome = workspace.run(&[], None, 0);
    assert_eq!(outcome.exit_code, ReconcileExitCode::NO_TEST_FILES);
    assert!(
        outcome.stderr.contains("no test files were provided"),
        "{}",
        outcome.stderr
    );
    assert!(!workspace.report_path().exists(), "no report is written");
}

#[test]
fn report_is_copied_for_ci() {
    let workspace = Workspace::new(&["spec/pass_1.t", "spec/pass_2.t"]);
    let fixture = workspace.write_fixture("pass.xml", PASS_1_PASS_2);
    let home = workspace.path().join("home");

    let outcome = run_expression(
        workspace
            .expression(
                "sh",
                FAKE_FRAMEWORK_ARGS,
                &["spec/pass_1.t", "spec/pass_2.t"],
                Some(&fixture),
                0,
            )
            .env("TDDIUM_REPO_ROOT", workspace.path().as_str())
            .env("TDDIUM_SESSION_ID", "session-9")
            .env("HOME", home.as_str()),
    );
    assert_eq!(outcome.exit_code, 0, "stderr: {}", outcome.stderr);

    let copied = home
        .join("results")
        .join("session-9")
        .join("session")
        .join("reports")
        .join(format!("{REPORT_ID}-rspec.xml"));
    assert_eq!(
        fs_err::read_to_string(&copied).expect("report was copied"),
        fs_err::read_to_string(workspace.report_path()).expect("report was written"),
    );
}
