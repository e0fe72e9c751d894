// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parse raw report bytes into a `TestSuite`.

use crate::{
    MalformedReportError, NonSuccessKind, Output, Property, TestCase, TestCaseStatus, TestSuite,
};
use chrono::DateTime;
use indexmap::IndexMap;
use quick_xml::{
    Reader,
    events::{BytesStart, BytesText, Event},
};
use std::time::Duration;

const TESTSUITE_TAG: &[u8] = b"testsuite";
const TESTCASE_TAG: &[u8] = b"testcase";
const PROPERTIES_TAG: &[u8] = b"properties";
const PROPERTY_TAG: &[u8] = b"property";
const FAILURE_TAG: &[u8] = b"failure";
const ERROR_TAG: &[u8] = b"error";
const SKIPPED_TAG: &[u8] = b"skipped";
const SYSTEM_OUT_TAG: &[u8] = b"system-out";
const SYSTEM_ERR_TAG: &[u8] = b"system-err";

type XmlReader<'a> = Reader<&'a [u8]>;

pub(crate) fn parse_test_suite(bytes: &[u8]) -> Result<TestSuite, MalformedReportError> {
    if bytes.is_empty() {
        return Err(MalformedReportError::Empty);
    }

    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();

    let (root, is_empty) = loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => break (start.into_owned(), false),
            Event::Empty(start) => break (start.into_owned(), true),
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Text(text) if is_whitespace(&text) => {}
            _ => return Err(MalformedReportError::MissingRoot),
        }
        buf.clear();
    };

    if root.name().as_ref() != TESTSUITE_TAG {
        return Err(MalformedReportError::UnexpectedRoot {
            found: element_name(&root),
        });
    }

    let mut suite = suite_from_attributes(&root)?;
    if !is_empty {
        read_suite_children(&mut reader, &mut suite)?;
    }

    // Only comments and whitespace may follow the root element.
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Comment(_) | Event::PI(_) => {}
            Event::Text(text) if is_whitespace(&text) => {}
            _ => return Err(MalformedReportError::TrailingContent),
        }
    }

    Ok(suite)
}

fn suite_from_attributes(start: &BytesStart<'_>) -> Result<TestSuite, MalformedReportError> {
    let mut attrs = attributes(start)?;

    let mut suite = TestSuite::new(attrs.shift_remove("name").unwrap_or_default());
    suite.tests = take_count(&mut attrs, "tests")?;
    suite.skipped = take_count(&mut attrs, "skipped")?;
    suite.failures = take_count(&mut attrs, "failures")?;
    suite.errors = take_count(&mut attrs, "errors")?;

    // Values that don't fit the model are kept verbatim as extra attributes.
    if let Some(time) = attrs.shift_remove("time") {
        match parse_time(&time) {
            Some(time) => suite.time = Some(time),
            None => {
                attrs.insert("time".to_owned(), time);
            }
        }
    }
    if let Some(timestamp) = attrs.shift_remove("timestamp") {
        match DateTime::parse_from_rfc3339(timestamp.trim()) {
            Ok(timestamp) => suite.timestamp = Some(timestamp),
            Err(_) => {
                attrs.insert("timestamp".to_owned(), timestamp);
            }
        }
    }
    suite.hostname = attrs.shift_remove("hostname");
    suite.extra = attrs;

    Ok(suite)
}

fn read_suite_children(
    reader: &mut XmlReader<'_>,
    suite: &mut TestSuite,
) -> Result<(), MalformedReportError> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf)?.into_owned();
        match event {
            Event::Start(start) => match start.name().as_ref() {
                PROPERTIES_TAG => read_properties(reader, suite)?,
                TESTCASE_TAG => {
                    let test_case = read_test_case(reader, &start, false)?;
                    suite.test_cases.push(test_case);
                }
                SYSTEM_OUT_TAG => {
                    suite.system_out = Some(Output::new(read_text(reader, &start)?));
                }
                SYSTEM_ERR_TAG => {
                    suite.system_err = Some(Output::new(read_text(reader, &start)?));
                }
                _ => skip_element(reader, &start)?,
            },
            Event::Empty(start) => {
                if start.name().as_ref() == TESTCASE_TAG {
                    let test_case = read_test_case(reader, &start, true)?;
                    suite.test_cases.push(test_case);
                }
            }
            Event::End(_) => return Ok(()),
            Event::Eof => {
                return Err(MalformedReportError::UnexpectedEof {
                    element: "testsuite".to_owned(),
                });
            }
            _ => {}
        }
    }
}

fn read_properties(
    reader: &mut XmlReader<'_>,
    suite: &mut TestSuite,
) -> Result<(), MalformedReportError> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf)?.into_owned();
        match event {
            Event::Empty(start) if start.name().as_ref() == PROPERTY_TAG => {
                suite.add_property(property_from(&start)?);
            }
            Event::Start(start) => {
                if start.name().as_ref() == PROPERTY_TAG {
                    suite.add_property(property_from(&start)?);
                }
                skip_element(reader, &start)?;
            }
            Event::End(_) => return Ok(()),
            Event::Eof => {
                return Err(MalformedReportError::UnexpectedEof {
                    element: "properties".to_owned(),
                });
            }
            _ => {}
        }
    }
}

fn property_from(start: &BytesStart<'_>) -> Result<Property, MalformedReportError> {
    let mut attrs = attributes(start)?;
    Ok(Property::new(
        attrs.shift_remove("name").unwrap_or_default(),
        attrs.shift_remove("value").unwrap_or_default(),
    ))
}

fn read_test_case(
    reader: &mut XmlReader<'_>,
    start: &BytesStart<'_>,
    is_empty: bool,
) -> Result<TestCase, MalformedReportError> {
    let mut attrs = attributes(start)?;

    let mut test_case = TestCase::new(
        attrs.shift_remove("name").unwrap_or_default(),
        TestCaseStatus::success(),
    );
    test_case.classname = attrs.shift_remove("classname");
    test_case.file = attrs.shift_remove("file");
    if let Some(time) = attrs.shift_remove("time") {
        match parse_time(&time) {
            Some(time) => test_case.time = Some(time),
            None => {
                attrs.insert("time".to_owned(), time);
            }
        }
    }
    test_case.extra = attrs;

    if is_empty {
        return Ok(test_case);
    }

    let mut buf = Vec::new();
    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf)?.into_owned();
        match event {
            Event::Start(child) => match child.name().as_ref() {
                tag @ (FAILURE_TAG | ERROR_TAG | SKIPPED_TAG) => {
                    let description = read_text(reader, &child)?;
                    test_case.status = status_from(tag, &child, description)?;
                }
                SYSTEM_OUT_TAG => {
                    test_case.system_out = Some(Output::new(read_text(reader, &child)?));
                }
                SYSTEM_ERR_TAG => {
                    test_case.system_err = Some(Output::new(read_text(reader, &child)?));
                }
                _ => skip_element(reader, &child)?,
            },
            Event::Empty(child) => match child.name().as_ref() {
                tag @ (FAILURE_TAG | ERROR_TAG | SKIPPED_TAG) => {
                    test_case.status = status_from(tag, &child, String::new())?;
                }
                _ => {}
            },
            Event::End(_) => return Ok(test_case),
            Event::Eof => {
                return Err(MalformedReportError::UnexpectedEof {
                    element: "testcase".to_owned(),
                });
            }
            _ => {}
        }
    }
}

fn status_from(
    tag: &[u8],
    start: &BytesStart<'_>,
    description: String,
) -> Result<TestCaseStatus, MalformedReportError> {
    let mut status = match tag {
        FAILURE_TAG => TestCaseStatus::non_success(NonSuccessKind::Failure),
        ERROR_TAG => TestCaseStatus::non_success(NonSuccessKind::Error),
        _ => TestCaseStatus::skipped(),
    };

    let mut attrs = attributes(start)?;
    if let Some(message) = attrs.shift_remove("message") {
        status.set_message(message);
    }
    if let Some(ty) = attrs.shift_remove("type") {
        status.set_type(ty);
    }
    if !description.is_empty() {
        status.set_description(description);
    }
    Ok(status)
}

/// Reads the text content of `start` up to its end tag, skipping nested elements.
fn read_text(
    reader: &mut XmlReader<'_>,
    start: &BytesStart<'_>,
) -> Result<String, MalformedReportError> {
    let mut text = String::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Text(chunk) => {
                text.push_str(&chunk.unescape().map_err(quick_xml::Error::from)?);
            }
            Event::CData(chunk) => text.push_str(&String::from_utf8_lossy(&chunk)),
            Event::Start(child) => {
                let child = child.into_owned();
                skip_element(reader, &child)?;
            }
            Event::End(_) => return Ok(text),
            Event::Eof => {
                return Err(MalformedReportError::UnexpectedEof {
                    element: element_name(start),
                });
            }
            _ => {}
        }
    }
}

fn skip_element(
    reader: &mut XmlReader<'_>,
    start: &BytesStart<'_>,
) -> Result<(), MalformedReportError> {
    let mut buf = Vec::new();
    reader.read_to_end_into(start.name(), &mut buf)?;
    Ok(())
}

fn attributes(start: &BytesStart<'_>) -> Result<IndexMap<String, String>, MalformedReportError> {
    let mut map = IndexMap::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(quick_xml::Error::from)?;
        map.insert(key, value.into_owned());
    }
    Ok(map)
}

fn take_count(
    attrs: &mut IndexMap<String, String>,
    attribute: &'static str,
) -> Result<usize, MalformedReportError> {
    let value = attrs
        .shift_remove(attribute)
        .ok_or(MalformedReportError::MissingCount { attribute })?;
    let parsed = value.trim().parse::<usize>();
    parsed.map_err(|error| MalformedReportError::InvalidCount {
        attribute,
        value,
        error,
    })
}

fn parse_time(time: &str) -> Option<Duration> {
    let secs: f64 = time.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn is_whitespace(text: &BytesText<'_>) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}
