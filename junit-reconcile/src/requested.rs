// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test files requested by the caller, and how they map onto report entries.

use crate::errors::InvalidInputError;
use camino::Utf8Path;
use std::{borrow::Cow, fmt};

const PATH_SEPARATORS: [char; 2] = ['/', '\\'];

/// The prefix the rspec JUnit formatter puts in front of every reported `file` attribute.
pub const REPORT_FILE_PREFIX: &str = "./";

/// A test file identifier supplied by the caller, exactly as it was passed in.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RequestedTest {
    id: String,
}

impl RequestedTest {
    /// Creates a new requested test from an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Returns the identifier as it was passed in.
    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// Returns the JUnit classname for this test file.
    pub fn classname(&self) -> String {
        derive_classname(&self.id)
    }

    /// Returns the `file` attribute the formatter would report for this test file.
    pub fn report_file(&self) -> Cow<'_, str> {
        normalize_report_file(&self.id)
    }
}

impl fmt::Display for RequestedTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl From<&str> for RequestedTest {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RequestedTest {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// Derives a JUnit classname from a test file identifier.
///
/// Exactly one trailing extension is stripped from the last path component, then every path
/// separator is replaced with `.`: `spec/models/user_spec.rb` becomes `spec.models.user_spec`.
/// A leading dot in the file name (as in `.hidden`) does not start an extension.
pub fn derive_classname(id: &str) -> String {
    let file_start = id.rfind(PATH_SEPARATORS).map_or(0, |idx| idx + 1);
    let stem_end = match id[file_start..].rfind('.') {
        Some(0) | None => id.len(),
        Some(dot) => file_start + dot,
    };
    id[..stem_end].replace(PATH_SEPARATORS, ".")
}

/// Normalizes a test file identifier to the form the formatter reports it in, i.e. with a
/// leading `./`.
pub fn normalize_report_file(id: &str) -> Cow<'_, str> {
    if id.starts_with(REPORT_FILE_PREFIX) {
        Cow::Borrowed(id)
    } else {
        Cow::Owned(format!("{REPORT_FILE_PREFIX}{id}"))
    }
}

/// Turns the test files passed on the command line into requested tests, checking that each one
/// exists. Relative paths are resolved against the current directory.
pub fn check_test_files(
    ids: impl IntoIterator<Item = String>,
) -> Result<Vec<RequestedTest>, InvalidInputError> {
    let tests: Vec<_> = ids.into_iter().map(RequestedTest::new).collect();
    if tests.is_empty() {
        return Err(InvalidInputError::NoTestFiles);
    }

    let missing: Vec<_> = tests
        .iter()
        .filter(|test| !Utf8Path::new(test.as_str()).is_file())
        .map(|test| test.as_str().to_owned())
        .collect();
    if !missing.is_empty() {
        return Err(InvalidInputError::MissingTestFiles { paths: missing });
    }

    Ok(tests)
}
