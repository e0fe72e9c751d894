// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Produce the final report from a framework run.

use crate::{
    classify::{RunOutcome, classify_parsed},
    reconcile::reconcile,
    requested::RequestedTest,
    runner::FrameworkRun,
};
use chrono::{DateTime, FixedOffset, Local};
use junit_model::{MalformedReportError, Property, SerializeError, TestSuite};
use tracing::{debug, info, warn};

/// The name of the property recording the exact framework invocation.
pub const COMMAND_PROPERTY: &str = "command";

/// The host name used when the real one can't be determined.
const UNKNOWN_HOSTNAME: &str = "localhost";

/// Recomputes the suite's counts, records the command line and serializes the suite.
///
/// The command line is stored verbatim; only XML escaping is applied on output.
pub fn finalize(suite: &mut TestSuite, command_line: &str) -> Result<Vec<u8>, SerializeError> {
    suite
        .recompute_counts()
        .add_property(Property::new(COMMAND_PROPERTY, command_line));
    suite.to_bytes()
}

/// Values used to build a report from scratch when the framework's own report is unusable.
#[derive(Clone, Debug)]
pub struct SuiteDefaults {
    /// The suite name.
    pub name: String,

    /// Recorded in the `generated_by` property.
    pub generator: String,

    /// The host name.
    pub hostname: String,

    /// The suite timestamp.
    pub now: DateTime<FixedOffset>,
}

impl SuiteDefaults {
    /// Detects the host name and current time for a suite called `name`.
    pub fn detect(name: impl Into<String>) -> Self {
        let hostname = whoami::fallible::hostname().unwrap_or_else(|error| {
            debug!("unable to determine host name, using {UNKNOWN_HOSTNAME}: {error}");
            UNKNOWN_HOSTNAME.to_owned()
        });

        Self {
            name: name.into(),
            generator: env!("CARGO_PKG_NAME").to_owned(),
            hostname,
            now: Local::now().fixed_offset(),
        }
    }

    /// Creates an empty suite from these defaults.
    pub fn empty_suite(&self) -> TestSuite {
        TestSuite::new_empty(
            self.name.as_str(),
            self.generator.as_str(),
            self.hostname.as_str(),
            self.now,
        )
    }
}

/// The result of reconciling a framework run, ready to be finalized.
#[derive(Clone, Debug)]
pub struct ReconciledRun {
    /// How the run was classified.
    pub outcome: RunOutcome,

    /// The reconciled suite. Counts are recomputed by [`finalize`].
    pub suite: TestSuite,

    /// The number of test cases added during reconciliation.
    pub synthesized: usize,
}

impl ReconciledRun {
    /// Finalizes the suite for the given command line and returns the serialized report.
    pub fn into_report(mut self, command_line: &str) -> Result<Vec<u8>, SerializeError> {
        finalize(&mut self.suite, command_line)
    }
}

/// Parses the framework's report once, classifies the run, falls back to an empty suite if the
/// report is unusable, and reconciles the requested tests against it.
pub fn reconcile_run(
    requested: &[RequestedTest],
    run: &FrameworkRun,
    defaults: &SuiteDefaults,
) -> ReconciledRun {
    let parsed = match run.raw_report.as_deref() {
        Some(bytes) => TestSuite::parse(bytes),
        None => Err(MalformedReportError::Empty),
    };
    let outcome = classify_parsed(&parsed, run.exit_code);
    debug!("run outcome: {outcome}");

    let mut suite = match parsed {
        Ok(suite) => suite,
        Err(MalformedReportError::Empty) => defaults.empty_suite(),
        Err(error) => {
            warn!("discarding malformed report: {error}");
            defaults.empty_suite()
        }
    };

    let synthesized = reconcile(&mut suite, requested, outcome, run);
    if synthesized > 0 {
        match outcome {
            RunOutcome::AllError(reason) => {
                info!("{reason}: marked {synthesized} test files as errored");
            }
            RunOutcome::Normal => {
                info!("marked {synthesized} unreported test files as skipped");
            }
        }
    }

    ReconciledRun {
        outcome,
        suite,
        synthesized,
    }
}
