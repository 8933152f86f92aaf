// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted result records.
//!
//! After a test case runs, its [`TestCaseRecord`] is written to `simtest-result.toml` inside its
//! working directory. Records are read back later to be shown or submitted without rerunning
//! anything.

use crate::errors::{RecordReadError, RecordReadErrorKind, RecordWriteError};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::{Utf8Path, Utf8PathBuf};
use simtest_metadata::TestCaseRecord;
use std::io::{self, Write};
use tracing::debug;

/// The name of the result record within a test case's working directory.
pub const RECORD_FILE_NAME: &str = "simtest-result.toml";

/// Returns the path of the result record for the working directory.
pub fn record_path(work_dir: &Utf8Path) -> Utf8PathBuf {
    work_dir.join(RECORD_FILE_NAME)
}

/// Writes `record` into `work_dir`, replacing any existing record atomically.
pub fn write_record(
    work_dir: &Utf8Path,
    record: &TestCaseRecord,
) -> Result<Utf8PathBuf, RecordWriteError> {
    let path = record_path(work_dir);
    let contents = toml::to_string(record).map_err(|err| RecordWriteError::Serialize {
        path: path.clone(),
        err,
    })?;

    AtomicFile::new(&path, OverwriteBehavior::AllowOverwrite)
        .write(|file| file.write_all(contents.as_bytes()))
        .map_err(|err| RecordWriteError::Write {
            path: path.clone(),
            err,
        })?;
    debug!("wrote result record to {path}");

    Ok(path)
}

/// Reads the record in `work_dir`, if one exists.
///
/// Records whose fields contradict each other are rejected.
pub fn read_record(work_dir: &Utf8Path) -> Result<Option<TestCaseRecord>, RecordReadError> {
    let path = record_path(work_dir);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(RecordReadError::new(path, RecordReadErrorKind::Read(err))),
    };

    let record: TestCaseRecord = toml::from_str(&contents)
        .map_err(|err| RecordReadError::new(&path, RecordReadErrorKind::Parse(err)))?;
    record
        .validate()
        .map_err(|err| RecordReadError::new(&path, RecordReadErrorKind::Invalid(err)))?;

    Ok(Some(record))
}
