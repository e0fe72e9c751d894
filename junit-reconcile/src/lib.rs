// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run a test framework and reconcile its JUnit report with the test files that were requested.
//!
//! Test frameworks that crash while loading a file (a syntax error, an undefined constant) often
//! produce no report, or a report that silently omits the broken files. `junit-reconcile` runs the
//! framework, then makes sure every requested test file shows up in the final report: as
//! reported, as skipped if the framework never mentioned it, or as errored if the run as a whole
//! failed.
//!
//! The pipeline is:
//!
//! 1. [`runner`]: run the framework with a JUnit formatter attached.
//! 2. [`classify`]: decide whether the framework's report can be trusted.
//! 3. [`reconcile`]: add test cases for requested files the report doesn't account for.
//! 4. [`synthesize`]: recompute counts, record the command and serialize.
//! 5. [`destination`]: write the report atomically and copy it for CI.

pub mod classify;
pub mod destination;
mod dispatch;
mod errors;
pub mod exit_codes;
mod output;
pub mod reconcile;
pub mod requested;
pub mod runner;
pub mod synthesize;

#[doc(hidden)]
pub use dispatch::*;
pub use errors::*;
pub use output::{LOG_ENV, OutputContext, StderrStyles};
