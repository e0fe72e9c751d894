// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read, build and write single-suite JUnit XML reports.
//!
//! The model is deliberately independent of any XML node API: a report is parsed into a plain
//! [`TestSuite`], mutated as ordinary Rust data, and serialized as a final step.

#![warn(missing_docs)]

mod errors;
mod parse;
mod report;
mod serialize;

pub use errors::*;
pub use report::*;
