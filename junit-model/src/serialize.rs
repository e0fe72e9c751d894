// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialize a `TestSuite`.

use crate::{
    NonSuccessKind, Output, Property, SerializeError, TestCase, TestCaseStatus, TestSuite,
};
use chrono::SecondsFormat;
use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event, attributes::Attribute},
    name::QName,
};
use std::{borrow::Cow, io, time::Duration};

static TESTSUITE_TAG: &str = "testsuite";
static TESTCASE_TAG: &str = "testcase";
static PROPERTIES_TAG: &str = "properties";
static PROPERTY_TAG: &str = "property";
static FAILURE_TAG: &str = "failure";
static ERROR_TAG: &str = "error";
static SKIPPED_TAG: &str = "skipped";
static SYSTEM_OUT_TAG: &str = "system-out";
static SYSTEM_ERR_TAG: &str = "system-err";

pub(crate) fn serialize_test_suite(
    test_suite: &TestSuite,
    writer: impl io::Write,
) -> Result<(), SerializeError> {
    let mut writer = Writer::new_with_indent(writer, b' ', 2);

    let decl = BytesDecl::new("1.0", Some("UTF-8"), None);
    writer.write_event(Event::Decl(decl))?;

    serialize_test_suite_impl(test_suite, &mut writer)?;

    // Add a trailing newline.
    writer.write_indent()?;
    Ok(())
}

fn serialize_test_suite_impl(
    test_suite: &TestSuite,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    // Use the destructuring syntax to ensure that all fields are handled.
    let TestSuite {
        name,
        tests,
        skipped,
        failures,
        errors,
        time,
        timestamp,
        hostname,
        properties,
        test_cases,
        system_out,
        system_err,
        extra,
    } = test_suite;

    let mut test_suite_tag = BytesStart::new(TESTSUITE_TAG);
    test_suite_tag.extend_attributes([
        attribute("name", name),
        attribute("tests", &tests.to_string()),
        attribute("skipped", &skipped.to_string()),
        attribute("failures", &failures.to_string()),
        attribute("errors", &errors.to_string()),
    ]);
    if let Some(time) = time {
        test_suite_tag.push_attribute(attribute("time", &serialize_time(time)));
    }
    if let Some(timestamp) = timestamp {
        test_suite_tag.push_attribute(attribute(
            "timestamp",
            &timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
        ));
    }
    if let Some(hostname) = hostname {
        test_suite_tag.push_attribute(attribute("hostname", hostname));
    }
    for (k, v) in extra {
        test_suite_tag.push_attribute(attribute(k, v));
    }
    writer.write_event(Event::Start(test_suite_tag))?;

    // Downstream consumers look up properties by path, so the element is always present.
    serialize_empty_start_tag(PROPERTIES_TAG, writer)?;
    for property in properties {
        serialize_property(property, writer)?;
    }
    serialize_end_tag(PROPERTIES_TAG, writer)?;

    for test_case in test_cases {
        serialize_test_case(test_case, writer)?;
    }

    if let Some(system_out) = system_out {
        serialize_output(system_out, SYSTEM_OUT_TAG, writer)?;
    }
    if let Some(system_err) = system_err {
        serialize_output(system_err, SYSTEM_ERR_TAG, writer)?;
    }

    serialize_end_tag(TESTSUITE_TAG, writer)?;
    writer.write_event(Event::Eof)?;

    Ok(())
}

fn serialize_property(
    property: &Property,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let mut property_tag = BytesStart::new(PROPERTY_TAG);
    property_tag.extend_attributes([
        attribute("name", &property.name),
        attribute("value", &property.value),
    ]);

    writer.write_event(Event::Empty(property_tag))?;
    Ok(())
}

fn serialize_test_case(
    test_case: &TestCase,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let TestCase {
        name,
        classname,
        file,
        time,
        status,
        system_out,
        system_err,
        extra,
    } = test_case;

    let mut test_case_tag = BytesStart::new(TESTCASE_TAG);
    if let Some(classname) = classname {
        test_case_tag.push_attribute(attribute("classname", classname));
    }
    test_case_tag.push_attribute(attribute("name", name));
    if let Some(file) = file {
        test_case_tag.push_attribute(attribute("file", file));
    }
    if let Some(time) = time {
        test_case_tag.push_attribute(attribute("time", &serialize_time(time)));
    }
    for (k, v) in extra {
        test_case_tag.push_attribute(attribute(k, v));
    }

    let has_children =
        !matches!(status, TestCaseStatus::Success) || system_out.is_some() || system_err.is_some();
    if !has_children {
        writer.write_event(Event::Empty(test_case_tag))?;
        return Ok(());
    }
    writer.write_event(Event::Start(test_case_tag))?;

    match status {
        TestCaseStatus::Success => {}
        TestCaseStatus::NonSuccess {
            kind,
            message,
            ty,
            description,
        } => {
            let tag_name = match kind {
                NonSuccessKind::Failure => FAILURE_TAG,
                NonSuccessKind::Error => ERROR_TAG,
            };
            serialize_status(
                message.as_deref(),
                ty.as_deref(),
                description.as_deref(),
                tag_name,
                writer,
            )?;
        }
        TestCaseStatus::Skipped {
            message,
            ty,
            description,
        } => {
            serialize_status(
                message.as_deref(),
                ty.as_deref(),
                description.as_deref(),
                SKIPPED_TAG,
                writer,
            )?;
        }
    }

    if let Some(system_out) = system_out {
        serialize_output(system_out, SYSTEM_OUT_TAG, writer)?;
    }
    if let Some(system_err) = system_err {
        serialize_output(system_err, SYSTEM_ERR_TAG, writer)?;
    }

    serialize_end_tag(TESTCASE_TAG, writer)?;

    Ok(())
}

fn serialize_status(
    message: Option<&str>,
    ty: Option<&str>,
    description: Option<&str>,
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let mut tag = BytesStart::new(tag_name);
    if let Some(message) = message {
        tag.push_attribute(attribute("message", message));
    }
    if let Some(ty) = ty {
        tag.push_attribute(attribute("type", ty));
    }

    match description {
        Some(description) => {
            writer.write_event(Event::Start(tag))?;
            writer.write_event(Event::Text(text(description)))?;
            serialize_end_tag(tag_name, writer)?;
        }
        None => {
            writer.write_event(Event::Empty(tag))?;
        }
    }

    Ok(())
}

fn serialize_output(
    output: &Output,
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    serialize_empty_start_tag(tag_name, writer)?;

    writer.write_event(Event::Text(text(output.as_str())))?;

    serialize_end_tag(tag_name, writer)?;

    Ok(())
}

fn serialize_empty_start_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let tag = BytesStart::new(tag_name);
    writer.write_event(Event::Start(tag))?;
    Ok(())
}

fn serialize_end_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let end_tag = BytesEnd::new(tag_name);
    writer.write_event(Event::End(end_tag))?;
    Ok(())
}

fn attribute<'a>(key: &'a str, value: &str) -> Attribute<'a> {
    Attribute {
        key: QName(key.as_bytes()),
        value: Cow::Owned(escape(value, true).into_bytes()),
    }
}

fn text(value: &str) -> BytesText<'static> {
    BytesText::from_escaped(escape(value, false))
}

/// Escapes `value` for use in an attribute or text node.
///
/// Characters XML 1.0 can't represent are dropped. Whitespace a reader would normalize is
/// written as character references: tabs and line breaks in attributes, carriage returns
/// everywhere.
fn escape(value: &str, in_attribute: bool) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if in_attribute => escaped.push_str("&quot;"),
            '\n' if in_attribute => escaped.push_str("&#10;"),
            '\t' if in_attribute => escaped.push_str("&#9;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' | '\n' => escaped.push(c),
            c if is_xml_char(c) => escaped.push(c),
            _ => {}
        }
    }
    escaped
}

// The Char production of XML 1.0. Surrogates can't occur in a `char`.
fn is_xml_char(c: char) -> bool {
    !matches!(c, '\x00'..='\x1f' | '\u{fffe}' | '\u{ffff}')
}

// Serialize time as seconds with 6 decimal points, the precision rspec reports.
fn serialize_time(time: &Duration) -> String {
    format!("{:.6}", time.as_secs_f64())
}
