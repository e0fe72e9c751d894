// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    destination::{
        CiEnvironment, DEFAULT_REPORT_PATTERN, DEFAULT_REPORTS_DIR, ReportDestination,
        raw_report_file, resolve_report_id,
    },
    errors::{ExpectedError, Result},
    output::{OutputContext, OutputOpts},
    requested::{RequestedTest, check_test_files},
    runner::{FrameworkCommand, FrameworkRun, unassembled_command_line},
    synthesize::{SuiteDefaults, reconcile_run},
};
use camino::Utf8PathBuf;
use chrono::Utc;
use clap::{Args, Parser};
use std::io::Write;
use tracing::{info, warn};

/// The default arguments passed to the framework before the formatter arguments.
pub const DEFAULT_FRAMEWORK_ARGS: &str = "--order defined --backtrace --color --tty";

/// Runs a test framework and writes a JUnit report that accounts for every test file.
///
/// The framework is run with a JUnit formatter attached. Test files the report doesn't mention
/// are marked as skipped; if the framework crashed before producing a usable report, every test
/// file is marked as errored. The exit code is the framework's own.
#[derive(Debug, Parser)]
#[command(version, name = "junit-reconcile")]
pub struct JunitReconcileApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(flatten)]
    framework: FrameworkOpts,

    #[command(flatten)]
    report: ReportOpts,

    /// Test files to run
    #[arg(value_name = "TEST_FILE")]
    test_files: Vec<String>,
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Framework options")]
struct FrameworkOpts {
    /// Test framework executable
    #[arg(
        long,
        value_name = "PROGRAM",
        env = "JUNIT_RECONCILE_FRAMEWORK",
        default_value = "rspec"
    )]
    framework: String,

    /// Arguments passed to the framework, split using shell quoting rules
    #[arg(
        long,
        value_name = "ARGS",
        env = "RSPEC_ARGS",
        default_value = DEFAULT_FRAMEWORK_ARGS,
        allow_hyphen_values = true
    )]
    framework_args: String,
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Report options")]
struct ReportOpts {
    /// Directory the final report is written to
    #[arg(
        long,
        value_name = "DIR",
        env = "REPORTS_DIRECTORY",
        default_value = DEFAULT_REPORTS_DIR
    )]
    reports_dir: Utf8PathBuf,

    /// Report file name; the first `%s` is replaced by the report ID
    #[arg(
        long,
        value_name = "PATTERN",
        env = "REPORT_PATTERN",
        default_value = DEFAULT_REPORT_PATTERN
    )]
    report_pattern: String,

    /// Report ID [default: CI execution ID, or the current Unix time]
    #[arg(long, value_name = "ID", env = "REPORT_ID")]
    report_id: Option<String>,

    /// Suite name used when the framework produced no usable report
    #[arg(long, value_name = "NAME", default_value = "rspec")]
    suite_name: String,
}

impl JunitReconcileApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the framework's exit code.
    pub fn exec(self) -> Result<i32> {
        let tests = check_test_files(self.test_files)?;

        let ci = CiEnvironment::from_env();
        let report_id = resolve_report_id(self.report.report_id.as_deref(), &ci, Utc::now());
        let destination = ReportDestination::new(
            self.report.reports_dir,
            &self.report.report_pattern,
            &report_id,
        );
        destination.prepare()?;

        let run = self.framework.run(&tests, &report_id);
        echo_output(&run.output);

        let defaults = SuiteDefaults::detect(self.report.suite_name);
        let reconciled = reconcile_run(&tests, &run, &defaults);
        let report = reconciled
            .into_report(&run.command)
            .map_err(|err| ExpectedError::ReportSerializeFailed { err })?;

        destination.write(&report)?;
        destination.copy_to_artifacts(&ci);

        Ok(run.exit_code)
    }
}

impl FrameworkOpts {
    /// Runs the framework on `tests`.
    ///
    /// Failing to assemble the invocation is treated like failing to start the framework, so a
    /// report is still written.
    fn run(&self, tests: &[RequestedTest], report_id: &str) -> FrameworkRun {
        let unassembled = || unassembled_command_line(&self.framework, &self.framework_args, tests);

        // Removed on drop, after the run has read it.
        let raw_report = match raw_report_file(report_id) {
            Ok(raw_report) => raw_report,
            Err(error) => {
                let error = format!("failed to create temporary report file: {error}");
                warn!("{error}");
                return FrameworkRun::not_started(unassembled(), error);
            }
        };

        let command = match FrameworkCommand::new(
            self.framework.as_str(),
            &self.framework_args,
            raw_report.path(),
            tests,
        ) {
            Ok(command) => command,
            Err(error) => {
                let error = format!("{error}: {}", error.err);
                warn!("{error}");
                return FrameworkRun::not_started(unassembled(), error);
            }
        };

        info!("running {} test files", tests.len());
        command.run()
    }
}

fn echo_output(output: &str) {
    let mut stdout = std::io::stdout().lock();
    if let Err(error) = stdout
        .write_all(output.as_bytes())
        .and_then(|()| stdout.flush())
    {
        warn!("failed to echo framework output: {error}");
    }
}
