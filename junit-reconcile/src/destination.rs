// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Where reports are written: the report ID, the final path and the CI artifact copy.

use crate::errors::ExpectedError;
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::NamedUtf8TempFile;
use chrono::{DateTime, Utc};
use std::io::{self, Write};
use tracing::{debug, info, warn};

/// The default reports directory.
pub const DEFAULT_REPORTS_DIR: &str = "reports";

/// The default report file name pattern.
pub const DEFAULT_REPORT_PATTERN: &str = "%s-rspec.xml";

/// The placeholder in a report file name pattern that is replaced by the report ID.
pub const REPORT_ID_PLACEHOLDER: &str = "%s";

/// CI-vendor environment markers, read once at startup.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CiEnvironment {
    /// `TDDIUM_REPO_ROOT`: set when running under the CI vendor.
    pub repo_root: Option<String>,

    /// `TDDIUM_SESSION_ID`.
    pub session_id: Option<String>,

    /// `TDDIUM_TEST_EXEC_ID_LIST`: comma-separated execution IDs.
    pub exec_id_list: Option<String>,

    /// `TDDIUM_TEST_EXEC_ID`.
    pub exec_id: Option<String>,

    /// The current user's home directory.
    pub home: Option<Utf8PathBuf>,
}

impl CiEnvironment {
    /// Reads the environment of the current process.
    pub fn from_env() -> Self {
        Self {
            repo_root: non_empty_var("TDDIUM_REPO_ROOT"),
            session_id: non_empty_var("TDDIUM_SESSION_ID"),
            exec_id_list: non_empty_var("TDDIUM_TEST_EXEC_ID_LIST"),
            exec_id: non_empty_var("TDDIUM_TEST_EXEC_ID"),
            home: home::home_dir().and_then(|home| Utf8PathBuf::try_from(home).ok()),
        }
    }

    /// Returns the execution ID of this run: the first entry of the execution ID list, or else
    /// the single execution ID.
    pub fn exec_id(&self) -> Option<&str> {
        let from_list = self
            .exec_id_list
            .as_deref()
            .and_then(|list| list.split(',').next())
            .map(str::trim)
            .filter(|id| !id.is_empty());
        from_list.or(self.exec_id.as_deref())
    }

    /// Returns the directory reports are copied to for the CI vendor to collect, if running
    /// under it.
    pub fn artifact_dir(&self) -> Option<Utf8PathBuf> {
        self.repo_root.as_ref()?;
        let session_id = self.session_id.as_deref()?;
        let home = self.home.as_deref()?;
        Some(home.join("results").join(session_id).join("session"))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Picks the report ID: an explicit one, else the CI execution ID, else the current Unix time in
/// fractional seconds.
pub fn resolve_report_id(
    explicit: Option<&str>,
    ci: &CiEnvironment,
    now: DateTime<Utc>,
) -> String {
    if let Some(id) = explicit.filter(|id| !id.is_empty()) {
        return id.to_owned();
    }
    if let Some(id) = ci.exec_id() {
        return id.to_owned();
    }
    format!("{}.{:06}", now.timestamp(), now.timestamp_subsec_micros())
}

/// Substitutes the report ID into the first placeholder of the pattern.
pub fn report_file_name(pattern: &str, report_id: &str) -> String {
    pattern.replacen(REPORT_ID_PLACEHOLDER, report_id, 1)
}

/// Creates the temporary file the framework writes its raw report to.
///
/// The file name starts with the report ID and the file is fresh, so a report left over from an
/// earlier run is never picked up.
pub fn raw_report_file(report_id: &str) -> io::Result<NamedUtf8TempFile> {
    camino_tempfile::Builder::new()
        .prefix(&format!("{report_id}-"))
        .suffix(".xml")
        .tempfile()
}

/// The final location of the reconciled report.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReportDestination {
    dir: Utf8PathBuf,
    path: Utf8PathBuf,
}

impl ReportDestination {
    /// Creates a destination for `report_id` in `dir`, named after `pattern`.
    pub fn new(dir: impl Into<Utf8PathBuf>, pattern: &str, report_id: &str) -> Self {
        let dir = dir.into();
        let path = dir.join(report_file_name(pattern, report_id));
        Self { dir, path }
    }

    /// Returns the reports directory.
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Returns the path of the final report.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Creates the reports directory if it doesn't exist.
    pub fn prepare(&self) -> Result<(), ExpectedError> {
        fs_err::create_dir_all(&self.dir).map_err(|err| ExpectedError::ReportsDirCreateFailed {
            dir: self.dir.clone(),
            err,
        })
    }

    /// Atomically writes the final report, replacing any existing file.
    pub fn write(&self, report: &[u8]) -> Result<(), ExpectedError> {
        AtomicFile::new(&self.path, OverwriteBehavior::AllowOverwrite)
            .write(|file| file.write_all(report))
            .map_err(|err| ExpectedError::ReportWriteFailed {
                path: self.path.clone(),
                err: match err {
                    atomicwrites::Error::Internal(err) | atomicwrites::Error::User(err) => err,
                },
            })?;
        info!("wrote report to {}", self.path);
        Ok(())
    }

    /// Copies the final report to the CI artifact directory, if running under the CI vendor.
    ///
    /// Returns the path copied to. Failures are logged and otherwise ignored.
    pub fn copy_to_artifacts(&self, ci: &CiEnvironment) -> Option<Utf8PathBuf> {
        let Some(artifact_dir) = ci.artifact_dir() else {
            debug!("not running under CI, skipping artifact copy");
            return None;
        };
        let target = artifact_dir.join(self.path.as_str().trim_start_matches(['/', '\\']));

        match copy_report(&self.path, &target) {
            Ok(()) => {
                debug!("copied report to {target}");
                Some(target)
            }
            Err(error) => {
                warn!("failed to copy report to CI artifacts: {error}");
                None
            }
        }
    }
}

fn copy_report(from: &Utf8Path, to: &Utf8Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::copy(from, to)?;
    Ok(())
}
