// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account for every requested test file in a report.

use crate::{
    classify::RunOutcome,
    requested::{RequestedTest, normalize_report_file},
    runner::FrameworkRun,
};
use junit_model::{NonSuccessKind, TestCase, TestCaseStatus, TestSuite};
use std::{collections::HashSet, time::Duration};

/// The message attached to test files marked as errored because the run as a whole failed.
pub const RUN_FAILURE_MESSAGE: &str = "Marked as error due to run failure";

/// Makes the suite account for every requested test file.
///
/// * With [`RunOutcome::AllError`], the reported test cases are discarded and every requested
///   file gets an errored test case. The suite's properties and attributes are kept.
/// * With [`RunOutcome::Normal`], every requested file that no test case's `file` attribute
///   refers to gets a skipped test case. Reported test cases are left untouched.
///
/// Returns the number of test cases appended.
pub fn reconcile(
    suite: &mut TestSuite,
    requested: &[RequestedTest],
    outcome: RunOutcome,
    run: &FrameworkRun,
) -> usize {
    let synthesized: Vec<_> = match outcome {
        RunOutcome::AllError(_) => {
            suite.test_cases.clear();
            suite.recompute_counts();
            let detail = run_failure_detail(run);
            requested
                .iter()
                .map(|test| errored_test_case(test, &detail))
                .collect()
        }
        RunOutcome::Normal => missing_tests(suite, requested)
            .into_iter()
            .map(skipped_test_case)
            .collect(),
    };

    let count = synthesized.len();
    suite.add_test_cases(synthesized);
    count
}

/// Returns the requested tests that no test case in the suite reports on, in the order they
/// were requested.
///
/// Both sides are compared in their `./`-prefixed form. Duplicate requests are returned as many
/// times as they were requested.
pub fn missing_tests<'a>(
    suite: &TestSuite,
    requested: &'a [RequestedTest],
) -> Vec<&'a RequestedTest> {
    let reported: HashSet<_> = suite
        .test_cases
        .iter()
        .filter_map(|test_case| test_case.file.as_deref())
        .map(normalize_report_file)
        .collect();

    requested
        .iter()
        .filter(|test| !reported.contains(&test.report_file()))
        .collect()
}

/// Returns the message attached to a requested test file the framework never reported on.
pub fn skipped_message(test: &RequestedTest) -> String {
    format!("{test} did not report output, marked as skipped")
}

fn run_failure_detail(run: &FrameworkRun) -> String {
    format!("{RUN_FAILURE_MESSAGE}:\n{}\n\n{}", run.command, run.output)
}

fn synthesized_test_case(name: String, test: &RequestedTest, status: TestCaseStatus) -> TestCase {
    let mut test_case = TestCase::new(name, status);
    test_case
        .set_classname(test.classname())
        .set_file(test.report_file())
        .set_time(Duration::ZERO);
    test_case
}

fn errored_test_case(test: &RequestedTest, detail: &str) -> TestCase {
    let mut status = TestCaseStatus::non_success(NonSuccessKind::Error);
    status.set_message(RUN_FAILURE_MESSAGE);

    let mut test_case = synthesized_test_case(format!("ERROR: {test}"), test, status);
    test_case.set_system_out(detail);
    test_case
}

fn skipped_test_case(test: &RequestedTest) -> TestCase {
    let message = skipped_message(test);
    let mut status = TestCaseStatus::skipped();
    status.set_message(message.as_str());

    let mut test_case = synthesized_test_case(format!("SKIPPED: {test}"), test, status);
    test_case.set_system_out(message);
    test_case
}
