// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use quick_xml::events::attributes::AttrError;
use std::num::ParseIntError;
use thiserror::Error;

/// An error that occurs while serializing a [`TestSuite`](crate::TestSuite).
///
/// Returned by [`TestSuite::serialize`](crate::TestSuite::serialize) and
/// [`TestSuite::to_bytes`](crate::TestSuite::to_bytes).
#[derive(Debug, Error)]
#[error("error serializing JUnit report")]
pub struct SerializeError {
    #[from]
    inner: quick_xml::Error,
}

impl From<std::io::Error> for SerializeError {
    fn from(error: std::io::Error) -> Self {
        Self {
            inner: error.into(),
        }
    }
}

/// An error that occurs while parsing raw report bytes into a [`TestSuite`](crate::TestSuite).
///
/// Returned by [`TestSuite::parse`](crate::TestSuite::parse).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MalformedReportError {
    /// The report contained no bytes at all.
    #[error("report is empty")]
    Empty,

    /// The report is not well-formed XML.
    #[error("report is not well-formed XML")]
    Xml(#[from] quick_xml::Error),

    /// An element in the report has a malformed attribute.
    #[error("report contains a malformed attribute")]
    Attribute(#[from] AttrError),

    /// The document has no root element.
    #[error("report has no root element")]
    MissingRoot,

    /// The root element is something other than `testsuite`.
    #[error("expected root element `testsuite`, found `{found}`")]
    UnexpectedRoot {
        /// The name of the root element that was found.
        found: String,
    },

    /// A count attribute on the `testsuite` element is missing.
    #[error("`testsuite` is missing the `{attribute}` attribute")]
    MissingCount {
        /// The name of the missing attribute.
        attribute: &'static str,
    },

    /// A count attribute on the `testsuite` element is not a non-negative integer.
    #[error("`testsuite` attribute `{attribute}` is not a count: `{value}`")]
    InvalidCount {
        /// The name of the attribute.
        attribute: &'static str,

        /// The value that failed to parse.
        value: String,

        /// The underlying parse error.
        #[source]
        error: ParseIntError,
    },

    /// The document ended before the named element was closed.
    #[error("report ended before `{element}` was closed")]
    UnexpectedEof {
        /// The element that was still open.
        element: String,
    },

    /// Content other than comments or whitespace follows the root element.
    #[error("unexpected content after the closing `testsuite` tag")]
    TrailingContent,
}
