// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    MalformedReportError, SerializeError, parse::parse_test_suite, serialize::serialize_test_suite,
};
use chrono::{DateTime, FixedOffset};
use indexmap::map::IndexMap;
use std::{fmt, io, time::Duration};

/// The name of the property recording the program that generated a report from scratch.
pub const GENERATED_BY_PROPERTY: &str = "generated_by";

/// Represents a single JUnit test suite: the root element of the report.
///
/// A `TestSuite` groups together several [`TestCase`] instances.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct TestSuite {
    /// The name of this test suite.
    pub name: String,

    /// The total number of tests in this suite.
    pub tests: usize,

    /// The total number of skipped (pending) tests in this suite.
    pub skipped: usize,

    /// The total number of tests in this suite that failed.
    ///
    /// A "failure" is usually some sort of *expected* issue in a test, such as an assertion.
    pub failures: usize,

    /// The total number of tests in this suite that errored.
    ///
    /// An "error" is usually some sort of *unexpected* issue in a test.
    pub errors: usize,

    /// The overall time taken by the suite.
    pub time: Option<Duration>,

    /// The time at which the suite began execution.
    pub timestamp: Option<DateTime<FixedOffset>>,

    /// The host the suite ran on.
    pub hostname: Option<String>,

    /// Custom properties, e.g. the random seed or the command that was run.
    pub properties: Vec<Property>,

    /// The test cases that form this suite, in document order.
    pub test_cases: Vec<TestCase>,

    /// Data written to standard output while the suite was executed.
    pub system_out: Option<Output>,

    /// Data written to standard error while the suite was executed.
    pub system_err: Option<Output>,

    /// Other attributes found on the `testsuite` element, in document order.
    pub extra: IndexMap<String, String>,
}

impl TestSuite {
    /// Creates a new, empty `TestSuite` with all counts set to zero.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: 0,
            skipped: 0,
            failures: 0,
            errors: 0,
            time: None,
            timestamp: None,
            hostname: None,
            properties: vec![],
            test_cases: vec![],
            system_out: None,
            system_err: None,
            extra: IndexMap::new(),
        }
    }

    /// Creates the base document used when the test framework produced no usable report.
    ///
    /// The suite has zero counts, no test cases, and a single `generated_by` property naming
    /// `generator`.
    pub fn new_empty(
        name: impl Into<String>,
        generator: impl Into<String>,
        hostname: impl Into<String>,
        now: impl Into<DateTime<FixedOffset>>,
    ) -> Self {
        let mut suite = Self::new(name);
        suite
            .set_time(Duration::ZERO)
            .set_timestamp(now)
            .set_hostname(hostname)
            .add_property(Property::new(GENERATED_BY_PROPERTY, generator));
        suite
    }

    /// Parses raw report bytes, as written by a JUnit formatter, into a `TestSuite`.
    ///
    /// The counts are taken from the document's own attributes and are *not* recomputed; use
    /// [`Self::recompute_counts`] for that.
    pub fn parse(bytes: &[u8]) -> Result<Self, MalformedReportError> {
        parse_test_suite(bytes)
    }

    /// Sets the start timestamp for the suite.
    pub fn set_timestamp(&mut self, timestamp: impl Into<DateTime<FixedOffset>>) -> &mut Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Sets the time taken for the suite.
    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = Some(time);
        self
    }

    /// Sets the host name.
    pub fn set_hostname(&mut self, hostname: impl Into<String>) -> &mut Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Appends a property to this suite.
    pub fn add_property(&mut self, property: impl Into<Property>) -> &mut Self {
        self.properties.push(property.into());
        self
    }

    /// Looks up the first property with the given name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|property| property.name == name)
    }

    /// Adds a test case to this suite and updates the counts.
    ///
    /// When building a report, use of this method is recommended over pushing to
    /// `self.test_cases` directly.
    pub fn add_test_case(&mut self, test_case: TestCase) -> &mut Self {
        self.tests += 1;
        match test_case.status.kind() {
            StatusKind::Passed => {}
            StatusKind::Skipped => self.skipped += 1,
            StatusKind::Failed => self.failures += 1,
            StatusKind::Error => self.errors += 1,
        }
        self.test_cases.push(test_case);
        self
    }

    /// Adds several test cases and updates the counts.
    pub fn add_test_cases(&mut self, test_cases: impl IntoIterator<Item = TestCase>) -> &mut Self {
        for test_case in test_cases {
            self.add_test_case(test_case);
        }
        self
    }

    /// Returns counts computed from the test cases, ignoring the stored attributes.
    pub fn computed_counts(&self) -> TestCounts {
        let mut counts = TestCounts::default();
        for test_case in &self.test_cases {
            counts.tests += 1;
            match test_case.status.kind() {
                StatusKind::Passed => {}
                StatusKind::Skipped => counts.skipped += 1,
                StatusKind::Failed => counts.failures += 1,
                StatusKind::Error => counts.errors += 1,
            }
        }
        counts
    }

    /// Returns the counts currently stored on the suite.
    pub fn counts(&self) -> TestCounts {
        TestCounts {
            tests: self.tests,
            skipped: self.skipped,
            failures: self.failures,
            errors: self.errors,
        }
    }

    /// Overwrites the stored counts with totals computed from the test cases.
    pub fn recompute_counts(&mut self) -> &mut Self {
        let TestCounts {
            tests,
            skipped,
            failures,
            errors,
        } = self.computed_counts();
        self.tests = tests;
        self.skipped = skipped;
        self.failures = failures;
        self.errors = errors;
        self
    }

    /// Serialize this suite as an XML document to the given writer.
    pub fn serialize(&self, writer: impl io::Write) -> Result<(), SerializeError> {
        serialize_test_suite(self, writer)
    }

    /// Serialize this suite as an XML document into a byte buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializeError> {
        let mut buf: Vec<u8> = vec![];
        self.serialize(&mut buf)?;
        Ok(buf)
    }
}

/// The `tests`, `skipped`, `failures` and `errors` counts of a [`TestSuite`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TestCounts {
    /// The total number of tests.
    pub tests: usize,
    /// The number of skipped tests.
    pub skipped: usize,
    /// The number of failed tests.
    pub failures: usize,
    /// The number of errored tests.
    pub errors: usize,
}

/// Represents a single test case.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct TestCase {
    /// The name of the test case.
    pub name: String,

    /// The "classname" of the test case.
    ///
    /// For rspec, this is the spec file path with its extension stripped and path separators
    /// replaced by dots.
    pub classname: Option<String>,

    /// The file the test case was defined in, as reported by the formatter.
    pub file: Option<String>,

    /// The time it took to execute this test case.
    pub time: Option<Duration>,

    /// The status of this test.
    pub status: TestCaseStatus,

    /// Data written to standard output while the test case was executed.
    pub system_out: Option<Output>,

    /// Data written to standard error while the test case was executed.
    pub system_err: Option<Output>,

    /// Other attributes found on the `testcase` element, in document order.
    pub extra: IndexMap<String, String>,
}

impl TestCase {
    /// Creates a new test case.
    pub fn new(name: impl Into<String>, status: TestCaseStatus) -> Self {
        Self {
            name: name.into(),
            classname: None,
            file: None,
            time: None,
            status,
            system_out: None,
            system_err: None,
            extra: IndexMap::new(),
        }
    }

    /// Sets the classname of the test.
    pub fn set_classname(&mut self, classname: impl Into<String>) -> &mut Self {
        self.classname = Some(classname.into());
        self
    }

    /// Sets the file the test is defined in.
    pub fn set_file(&mut self, file: impl Into<String>) -> &mut Self {
        self.file = Some(file.into());
        self
    }

    /// Sets the time taken for the test case.
    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = Some(time);
        self
    }

    /// Sets standard output.
    pub fn set_system_out(&mut self, system_out: impl AsRef<str>) -> &mut Self {
        self.system_out = Some(Output::new(system_out));
        self
    }

    /// Sets standard error.
    pub fn set_system_err(&mut self, system_err: impl AsRef<str>) -> &mut Self {
        self.system_err = Some(Output::new(system_err));
        self
    }
}

/// Represents the outcome of a test case.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TestCaseStatus {
    /// This test case passed. Serialized without a status element.
    Success,

    /// This test case did not pass.
    NonSuccess {
        /// Whether this test case failed in an expected way (failure) or an unexpected way
        /// (error).
        kind: NonSuccessKind,

        /// The failure message.
        message: Option<String>,

        /// The "type" of failure that occurred.
        ty: Option<String>,

        /// The description of the failure.
        ///
        /// This is serialized and deserialized from the text node of the element.
        description: Option<String>,
    },

    /// This test case was not run.
    Skipped {
        /// The skip message.
        message: Option<String>,

        /// The "type" of skip that occurred.
        ty: Option<String>,

        /// The description of the skip.
        ///
        /// This is serialized and deserialized from the text node of the element.
        description: Option<String>,
    },
}

impl TestCaseStatus {
    /// Creates a new `TestCaseStatus` that represents a successful test.
    pub fn success() -> Self {
        TestCaseStatus::Success
    }

    /// Creates a new `TestCaseStatus` that represents an unsuccessful test.
    pub fn non_success(kind: NonSuccessKind) -> Self {
        TestCaseStatus::NonSuccess {
            kind,
            message: None,
            ty: None,
            description: None,
        }
    }

    /// Creates a new `TestCaseStatus` that represents a skipped test.
    pub fn skipped() -> Self {
        TestCaseStatus::Skipped {
            message: None,
            ty: None,
            description: None,
        }
    }

    /// Returns the flat status kind, as counted on the suite.
    pub fn kind(&self) -> StatusKind {
        match self {
            TestCaseStatus::Success => StatusKind::Passed,
            TestCaseStatus::NonSuccess {
                kind: NonSuccessKind::Failure,
                ..
            } => StatusKind::Failed,
            TestCaseStatus::NonSuccess {
                kind: NonSuccessKind::Error,
                ..
            } => StatusKind::Error,
            TestCaseStatus::Skipped { .. } => StatusKind::Skipped,
        }
    }

    /// Returns the message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            TestCaseStatus::Success => None,
            TestCaseStatus::NonSuccess { message, .. }
            | TestCaseStatus::Skipped { message, .. } => message.as_deref(),
        }
    }

    /// Returns the description, if any.
    pub fn description(&self) -> Option<&str> {
        match self {
            TestCaseStatus::Success => None,
            TestCaseStatus::NonSuccess { description, .. }
            | TestCaseStatus::Skipped { description, .. } => description.as_deref(),
        }
    }

    /// Sets the message. No-op if this is a success case.
    pub fn set_message(&mut self, message: impl Into<String>) -> &mut Self {
        let message_mut = match self {
            TestCaseStatus::Success => return self,
            TestCaseStatus::NonSuccess { message, .. } => message,
            TestCaseStatus::Skipped { message, .. } => message,
        };
        *message_mut = Some(message.into());
        self
    }

    /// Sets the type. No-op if this is a success case.
    pub fn set_type(&mut self, ty: impl Into<String>) -> &mut Self {
        let ty_mut = match self {
            TestCaseStatus::Success => return self,
            TestCaseStatus::NonSuccess { ty, .. } => ty,
            TestCaseStatus::Skipped { ty, .. } => ty,
        };
        *ty_mut = Some(ty.into());
        self
    }

    /// Sets the description (text node). No-op if this is a success case.
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        let description_mut = match self {
            TestCaseStatus::Success => return self,
            TestCaseStatus::NonSuccess { description, .. } => description,
            TestCaseStatus::Skipped { description, .. } => description,
        };
        *description_mut = Some(description.into());
        self
    }
}

/// The kind of a non-successful test case.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NonSuccessKind {
    /// This is an expected failure. Serialized as `failure`.
    Failure,

    /// This is an unexpected error. Serialized as `error`.
    Error,
}

/// The flat status of a test case: passed, skipped, failed or error.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum StatusKind {
    /// The test passed.
    Passed,
    /// The test was skipped.
    Skipped,
    /// The test failed.
    Failed,
    /// The test errored.
    Error,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusKind::Passed => write!(f, "passed"),
            StatusKind::Skipped => write!(f, "skipped"),
            StatusKind::Failed => write!(f, "failed"),
            StatusKind::Error => write!(f, "error"),
        }
    }
}

/// Custom properties set during test execution, e.g. the command that was run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Property {
    /// The name of the property.
    pub name: String,

    /// The value of the property.
    pub value: String,
}

impl Property {
    /// Creates a new `Property` instance.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl<T> From<(T, T)> for Property
where
    T: Into<String>,
{
    fn from((k, v): (T, T)) -> Self {
        Property::new(k, v)
    }
}

/// Represents text that is written out to standard output or standard error during test
/// execution.
///
/// # Encoding
///
/// Captured output is typically colored terminal text. ANSI escape sequences and characters
/// that cannot appear in an XML 1.0 document are removed on construction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Output {
    output: Box<str>,
}

impl Output {
    /// Creates a new output, removing escape sequences and non-printable characters from it.
    pub fn new(output: impl AsRef<str>) -> Self {
        let output = strip_ansi_escapes::strip_str(output.as_ref());
        let output = output
            .replace(
                |c| matches!(c, '\x00'..='\x08' | '\x0b' | '\x0c' | '\x0e'..='\x1f'),
                "",
            )
            .into_boxed_str();
        Self { output }
    }

    /// Returns the output.
    pub fn as_str(&self) -> &str {
        &self.output
    }

    /// Converts the output into a string.
    pub fn into_string(self) -> String {
        self.output.into_string()
    }
}

impl AsRef<str> for Output {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<Output> for String {
    fn from(output: Output) -> Self {
        output.into_string()
    }
}
