// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decide how far the framework's own report can be trusted.

use junit_model::{MalformedReportError, TestSuite};
use std::fmt;

/// How a test run is reconciled, computed once per invocation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunOutcome {
    /// The framework's report is at least partially trustworthy. Requested files it doesn't
    /// mention are marked as skipped.
    Normal,

    /// The framework's report is unusable. Every requested file is marked as errored.
    AllError(AllErrorReason),
}

impl RunOutcome {
    /// Returns true if every requested test is to be marked as an error.
    pub fn is_all_error(self) -> bool {
        matches!(self, RunOutcome::AllError(_))
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Normal => write!(f, "normal"),
            RunOutcome::AllError(reason) => write!(f, "all-error ({reason})"),
        }
    }
}

/// Why a run was classified as [`RunOutcome::AllError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AllErrorReason {
    /// No report was produced, or it was empty.
    NoReport,

    /// The report could not be parsed.
    MalformedReport,

    /// The framework exited with a failure without reporting a single test: a load-time or
    /// framework-level failure rather than a per-test one.
    FrameworkFailure,
}

impl fmt::Display for AllErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllErrorReason::NoReport => write!(f, "no report was produced"),
            AllErrorReason::MalformedReport => write!(f, "the report is malformed"),
            AllErrorReason::FrameworkFailure => {
                write!(f, "the framework failed without reporting any tests")
            }
        }
    }
}

/// Classifies a run from its raw report bytes and exit code.
pub fn classify(raw_report: Option<&[u8]>, exit_code: i32) -> RunOutcome {
    match raw_report {
        Some(bytes) => classify_parsed(&TestSuite::parse(bytes), exit_code),
        None => RunOutcome::AllError(AllErrorReason::NoReport),
    }
}

/// Classifies a run from an already-parsed report and exit code.
pub fn classify_parsed(
    parsed: &Result<TestSuite, MalformedReportError>,
    exit_code: i32,
) -> RunOutcome {
    match parsed {
        Err(MalformedReportError::Empty) => RunOutcome::AllError(AllErrorReason::NoReport),
        Err(_) => RunOutcome::AllError(AllErrorReason::MalformedReport),
        // The report's own attribute is consulted, not the number of test case elements.
        Ok(suite) if suite.tests == 0 && exit_code != 0 => {
            RunOutcome::AllError(AllErrorReason::FrameworkFailure)
        }
        Ok(_) => RunOutcome::Normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    static ONE_PASSING: &[u8] = br#"<testsuite name="rspec" tests="1" skipped="0" failures="0" errors="0"><testcase name="a" file="./spec/a_spec.rb"/></testsuite>"#;
    static ONE_FAILING: &[u8] = br#"<testsuite name="rspec" tests="1" skipped="0" failures="1" errors="0"><testcase name="a" file="./spec/a_spec.rb"><failure message="boom"/></testcase></testsuite>"#;
    static ZERO_TESTS: &[u8] =
        br#"<testsuite name="rspec" tests="0" skipped="0" failures="0" errors="0"></testsuite>"#;

    #[test_case(None, 0 => RunOutcome::AllError(AllErrorReason::NoReport) ; "no report, success")]
    #[test_case(None, 1 => RunOutcome::AllError(AllErrorReason::NoReport) ; "no report, failure")]
    #[test_case(Some(b""), 1 => RunOutcome::AllError(AllErrorReason::NoReport) ; "empty report")]
    #[test_case(Some(b"<testsuite"), 0 => RunOutcome::AllError(AllErrorReason::MalformedReport) ; "truncated report")]
    #[test_case(Some(b"<html/>"), 0 => RunOutcome::AllError(AllErrorReason::MalformedReport) ; "wrong root")]
    #[test_case(Some(ZERO_TESTS), 1 => RunOutcome::AllError(AllErrorReason::FrameworkFailure) ; "zero tests, failure")]
    #[test_case(Some(ZERO_TESTS), 0 => RunOutcome::Normal ; "zero tests, success")]
    #[test_case(Some(ONE_PASSING), 0 => RunOutcome::Normal ; "passing run")]
    #[test_case(Some(ONE_FAILING), 1 => RunOutcome::Normal ; "failing run")]
    #[test_case(Some(ONE_PASSING), 1 => RunOutcome::Normal ; "passing report, failure exit")]
    fn classify_runs(raw_report: Option<&[u8]>, exit_code: i32) -> RunOutcome {
        classify(raw_report, exit_code)
    }

    #[test]
    fn classify_uses_count_attribute() {
        // A report claiming zero tests is a framework failure even if it lists test cases.
        let lying = br#"<testsuite tests="0" skipped="0" failures="0" errors="0"><testcase name="a"/></testsuite>"#;
        assert_eq!(
            classify(Some(lying), 1),
            RunOutcome::AllError(AllErrorReason::FrameworkFailure)
        );
    }

    #[test]
    fn outcome_display() {
        assert_eq!(RunOutcome::Normal.to_string(), "normal");
        assert_eq!(
            RunOutcome::AllError(AllErrorReason::NoReport).to_string(),
            "all-error (no report was produced)"
        );
        assert!(RunOutcome::AllError(AllErrorReason::MalformedReport).is_all_error());
        assert!(!RunOutcome::Normal.is_all_error());
    }
}
