// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running the test framework and capturing what it did.

use crate::{
    errors::FrameworkArgsParseError, exit_codes::ReconcileExitCode, requested::RequestedTest,
};
use camino::{Utf8Path, Utf8PathBuf};
use std::{fmt, io, process::ExitStatus};
use tracing::{debug, warn};

/// Arguments that select the JUnit formatter.
pub const FORMATTER_ARGS: [&str; 2] = ["--format", "RspecJunitFormatter"];

/// The argument preceding the path the formatter writes its report to.
pub const REPORT_OUT_ARG: &str = "--out";

/// Everything the framework run produced, as consumed by reconciliation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FrameworkRun {
    /// The exact invocation, shell-quoted.
    pub command: String,

    /// The framework's exit code.
    pub exit_code: i32,

    /// Captured standard output.
    pub output: String,

    /// The raw report written by the formatter, if any.
    pub raw_report: Option<Vec<u8>>,
}

impl FrameworkRun {
    /// A run in which the framework was never started.
    ///
    /// The run has exit code [`ReconcileExitCode::FRAMEWORK_EXEC_FAILED`], the error as its
    /// output and no report, so every requested test file ends up marked as errored.
    pub fn not_started(command: String, error: impl fmt::Display) -> Self {
        Self {
            command,
            exit_code: ReconcileExitCode::FRAMEWORK_EXEC_FAILED,
            output: error.to_string(),
            raw_report: None,
        }
    }
}

/// A test framework invocation with the JUnit formatter attached.
#[derive(Clone, Debug)]
pub struct FrameworkCommand {
    program: String,
    args: Vec<String>,
    report_path: Utf8PathBuf,
}

impl FrameworkCommand {
    /// Builds the invocation `<program> <framework args> --format RspecJunitFormatter --out
    /// <report path> <tests>`.
    ///
    /// `framework_args` is split using shell quoting rules.
    pub fn new(
        program: impl Into<String>,
        framework_args: &str,
        report_path: impl Into<Utf8PathBuf>,
        tests: &[RequestedTest],
    ) -> Result<Self, FrameworkArgsParseError> {
        let mut args =
            shell_words::split(framework_args).map_err(|err| FrameworkArgsParseError {
                args: framework_args.to_owned(),
                err,
            })?;
        let report_path = report_path.into();

        args.extend(FORMATTER_ARGS.iter().map(|arg| (*arg).to_owned()));
        args.push(REPORT_OUT_ARG.to_owned());
        args.push(report_path.as_str().to_owned());
        args.extend(tests.iter().map(|test| test.as_str().to_owned()));

        Ok(Self {
            program: program.into(),
            args,
            report_path,
        })
    }

    /// Returns the path the formatter is told to write its report to.
    pub fn report_path(&self) -> &Utf8Path {
        &self.report_path
    }

    /// Returns the program followed by all of its arguments.
    pub fn all_args(&self) -> Vec<&str> {
        let mut all_args = vec![self.program.as_str()];
        all_args.extend(self.args.iter().map(String::as_str));
        all_args
    }

    /// Returns the invocation as a single shell-quoted string.
    pub fn command_line(&self) -> String {
        shell_words::join(self.all_args())
    }

    fn to_expression(&self) -> duct::Expression {
        // stderr is inherited so framework diagnostics reach the terminal as they happen.
        duct::cmd(self.program.as_str(), &self.args)
            .stdout_capture()
            .unchecked()
    }

    /// Runs the framework to completion and collects its exit code, output and report.
    ///
    /// This never fails: if the framework cannot be started, the returned run has exit code
    /// [`ReconcileExitCode::FRAMEWORK_EXEC_FAILED`], the error as its output and no report.
    pub fn run(&self) -> FrameworkRun {
        let command = self.command_line();
        debug!("running `{command}`");

        match self.to_expression().run() {
            Ok(output) => {
                let exit_code = exit_code_of(output.status);
                debug!("framework exited with code {exit_code}");
                FrameworkRun {
                    command,
                    exit_code,
                    output: String::from_utf8_lossy(&output.stdout).into_owned(),
                    raw_report: read_raw_report(&self.report_path),
                }
            }
            Err(error) => {
                warn!("failed to execute `{command}`: {error}");
                FrameworkRun::not_started(command, error)
            }
        }
    }
}

/// Renders an invocation whose arguments could not be assembled.
///
/// `framework_args` is included verbatim since it couldn't be split, and the report path is
/// left out.
pub fn unassembled_command_line(
    program: &str,
    framework_args: &str,
    tests: &[RequestedTest],
) -> String {
    let mut parts = vec![shell_words::quote(program).into_owned()];
    if !framework_args.is_empty() {
        parts.push(framework_args.to_owned());
    }
    parts.push(shell_words::join(FORMATTER_ARGS));
    if !tests.is_empty() {
        parts.push(shell_words::join(tests.iter().map(RequestedTest::as_str)));
    }
    parts.join(" ")
}

/// Converts an exit status into the exit code a shell would report.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => signal_exit_code(status),
    }
}

#[cfg(unix)]
fn signal_exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status.signal().map_or(1, |signal| 128 + signal)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: ExitStatus) -> i32 {
    1
}

/// Reads the formatter's report. A missing or unreadable report is treated as absent.
pub fn read_raw_report(path: &Utf8Path) -> Option<Vec<u8>> {
    match fs_err::read(path) {
        Ok(bytes) => Some(bytes),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            debug!("no report found at `{path}`");
            None
        }
        Err(error) => {
            warn!("{error}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tests(ids: &[&str]) -> Vec<RequestedTest> {
        ids.iter().copied().map(RequestedTest::from).collect()
    }

    #[test]
    fn command_line_layout() {
        let command = FrameworkCommand::new(
            "rspec",
            "--order defined --backtrace --color --tty",
            "/tmp/1-abc.xml",
            &tests(&["spec/a_spec.rb", "spec/b_spec.rb"]),
        )
        .expect("valid framework args");

        assert_eq!(
            command.all_args(),
            vec![
                "rspec",
                "--order",
                "defined",
                "--backtrace",
                "--color",
                "--tty",
                "--format",
                "RspecJunitFormatter",
                "--out",
                "/tmp/1-abc.xml",
                "spec/a_spec.rb",
                "spec/b_spec.rb",
            ]
        );
        assert_eq!(
            command.command_line(),
            "rspec --order defined --backtrace --color --tty --format RspecJunitFormatter \
             --out /tmp/1-abc.xml spec/a_spec.rb spec/b_spec.rb"
        );
        assert_eq!(command.report_path().as_str(), "/tmp/1-abc.xml");
    }

    #[test]
    fn command_line_quotes_arguments() {
        let command = FrameworkCommand::new(
            "bundle",
            r#"exec rspec --tag "slow & steady""#,
            "/tmp/out.xml",
            &tests(&["spec/it's_spec.rb"]),
        )
        .expect("valid framework args");

        assert_eq!(
            command.command_line(),
            r#"bundle exec rspec --tag 'slow & steady' --format RspecJunitFormatter --out /tmp/out.xml 'spec/it'\''s_spec.rb'"#
        );
    }

    #[test]
    fn unbalanced_quotes_are_rejected() {
        let err = FrameworkCommand::new("rspec", "--tag 'unterminated", "/tmp/out.xml", &[])
            .expect_err("unbalanced quote fails");
        assert_eq!(err.args, "--tag 'unterminated");
    }

    #[test]
    fn unassembled_command_line_keeps_raw_args() {
        assert_eq!(
            unassembled_command_line(
                "rspec",
                "--tag 'unterminated",
                &tests(&["spec/a_spec.rb", "spec/it's_spec.rb"]),
            ),
            "rspec --tag 'unterminated --format RspecJunitFormatter spec/a_spec.rb \
             'spec/it'\\''s_spec.rb'"
        );
        assert_eq!(
            unassembled_command_line("rspec", "", &[]),
            "rspec --format RspecJunitFormatter"
        );
    }

    #[test]
    fn not_started_run_has_no_report() {
        let run = FrameworkRun::not_started("rspec spec/a_spec.rb".to_owned(), "no such file");
        assert_eq!(run.exit_code, ReconcileExitCode::FRAMEWORK_EXEC_FAILED);
        assert_eq!(run.output, "no such file");
        assert_eq!(run.raw_report, None);
    }

    #[test]
    fn spawn_failure_is_a_failed_run() {
        let command = FrameworkCommand::new(
            "/nonexistent/junit-reconcile/framework",
            "",
            "/nonexistent/junit-reconcile/out.xml",
            &tests(&["spec/a_spec.rb"]),
        )
        .expect("valid framework args");

        let run = command.run();
        assert_eq!(run.exit_code, ReconcileExitCode::FRAMEWORK_EXEC_FAILED);
        assert_eq!(run.raw_report, None);
        assert!(!run.output.is_empty());
        assert_eq!(
            run.command,
            "/nonexistent/junit-reconcile/framework --format RspecJunitFormatter --out \
             /nonexistent/junit-reconcile/out.xml spec/a_spec.rb"
        );
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use camino_tempfile::Utf8TempDir;
        use pretty_assertions::assert_eq;

        // The framework arguments come before the appended ones, so `sh -c <script> sh` sees
        // `--format RspecJunitFormatter --out <path>` as `$1` to `$4`.
        fn sh(script: &str, report_path: &Utf8Path) -> FrameworkRun {
            let framework_args = shell_words::join(["-c", script, "sh"]);
            FrameworkCommand::new("sh", &framework_args, report_path, &tests(&["spec/a_spec.rb"]))
                .expect("valid framework args")
                .run()
        }

        #[test]
        fn captures_exit_code_and_stdout() {
            let dir = Utf8TempDir::new().expect("created temp dir");
            let run = sh("echo captured; exit 3", &dir.path().join("out.xml"));

            assert_eq!(run.exit_code, 3);
            assert_eq!(run.output, "captured\n");
            assert_eq!(run.raw_report, None);
        }

        #[test]
        fn reads_report_written_to_out() {
            let dir = Utf8TempDir::new().expect("created temp dir");
            let run = sh(
                r#"test "$3" = --out && printf '<testsuite/>' > "$4""#,
                &dir.path().join("out.xml"),
            );

            assert_eq!(run.exit_code, 0);
            assert_eq!(run.raw_report.as_deref(), Some(&b"<testsuite/>"[..]));
        }

        #[test]
        fn signal_exit_code_is_offset() {
            let dir = Utf8TempDir::new().expect("created temp dir");
            let run = sh("kill -9 $$", &dir.path().join("out.xml"));

            assert_eq!(run.exit_code, 128 + 9);
        }
    }
}
