// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    exit_codes::ReconcileExitCode,
    output::{NO_HEADING_TARGET, StderrStyles},
};
use camino::Utf8PathBuf;
use junit_model::SerializeError;
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// The test files passed in on the command line are unusable.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum InvalidInputError {
    /// No test files were passed in.
    #[error("no test files were provided")]
    NoTestFiles,

    /// Some of the test files passed in do not exist.
    #[error("test files not found: {}", paths.join(", "))]
    MissingTestFiles {
        /// The missing paths, in the order they were passed in.
        paths: Vec<String>,
    },
}

impl InvalidInputError {
    /// Returns the exit code for this error.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::NoTestFiles => ReconcileExitCode::NO_TEST_FILES,
            Self::MissingTestFiles { .. } => ReconcileExitCode::INVALID_TEST_FILE,
        }
    }
}

/// The framework arguments could not be split using shell quoting rules.
///
/// This doesn't stop the report from being written: the run is treated as one in which the
/// framework could not be started.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("failed to parse framework arguments `{args}`")]
pub struct FrameworkArgsParseError {
    /// The arguments as passed in.
    pub args: String,

    /// The underlying error.
    #[source]
    pub err: shell_words::ParseError,
}

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An expected error that stops `junit-reconcile` from producing a report.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("invalid input")]
    InvalidInput {
        #[from]
        err: InvalidInputError,
    },
    #[error("failed to create reports directory")]
    ReportsDirCreateFailed {
        dir: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to serialize report")]
    ReportSerializeFailed {
        #[source]
        err: SerializeError,
    },
    #[error("failed to write report")]
    ReportWriteFailed {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput { err } => err.process_exit_code(),
            Self::ReportsDirCreateFailed { .. } => ReconcileExitCode::SETUP_ERROR,
            Self::ReportSerializeFailed { .. } | Self::ReportWriteFailed { .. } => {
                ReconcileExitCode::WRITE_REPORT_FAILED
            }
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::InvalidInput {
                err: InvalidInputError::NoTestFiles,
            } => {
                error!("no test files were provided");
                None
            }
            Self::InvalidInput {
                err: InvalidInputError::MissingTestFiles { paths },
            } => {
                for path in paths {
                    error!("test file `{}` does not exist", path.style(styles.bold));
                }
                None
            }
            Self::ReportsDirCreateFailed { dir, err } => {
                error!(
                    "failed to create reports directory `{}`",
                    dir.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::ReportSerializeFailed { err } => {
                error!("failed to serialize report");
                Some(err as &dyn Error)
            }
            Self::ReportWriteFailed { path, err } => {
                error!("failed to write report to `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
