// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! CSV result files
//!
//! One file per run, written in a single pass: header row, then one row per
//! trial record. Reading accepts files from any run, with label and boolean
//! columns matched case-insensitively.

use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use chrono::Utc;
use tracing::{debug, info};

use crate::{
    error::{HarnessError, HarnessResult},
    types::TrialRecord,
};

/// Result file columns, in order
pub const COLUMNS: [&str; 9] = [
    "model_name",
    "timestamp",
    "prompt_name",
    "sms_id",
    "sms_text",
    "original_classification",
    "model_classification",
    "explanation",
    "is_correct",
];

/// Reads and writes trial records as CSV
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultStore;

impl ResultStore {
    /// Write `records` to `path`, creating parent directories
    ///
    /// # Errors
    ///
    /// Any failure is reported as [`HarnessError::Persistence`]
    pub fn write(records: &[TrialRecord], path: impl AsRef<Path>) -> HarnessResult<()> {
        let path = path.as_ref();
        let persistence = |e: HarnessError| HarnessError::persistence(path.display(), e);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| persistence(e.into()))?;
        }
        let file = File::create(path).map_err(|e| persistence(e.into()))?;
        Self::write_to(records, file).map_err(persistence)?;

        info!(path = %path.display(), records = records.len(), "Results written");
        Ok(())
    }

    /// Write `records` to any writer
    pub fn write_to<W: Write>(records: &[TrialRecord], writer: W) -> HarnessResult<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        writer.write_record(COLUMNS)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read all records from `path`
    pub fn read(path: impl AsRef<Path>) -> HarnessResult<Vec<TrialRecord>> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| HarnessError::io(format!("{}: {e}", path.display())))?;
        let records = Self::read_from(file)?;
        debug!(path = %path.display(), records = records.len(), "Results read");
        Ok(records)
    }

    /// Read all records from any reader
    pub fn read_from<R: Read>(reader: R) -> HarnessResult<Vec<TrialRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let missing: Vec<&str> = COLUMNS
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|header| header == *column))
            .collect();
        if !missing.is_empty() {
            return Err(HarnessError::validation(format!(
                "Result file is missing columns: {}",
                missing.join(", ")
            )));
        }

        reader
            .deserialize()
            .map(|row| row.map_err(HarnessError::from))
            .collect()
    }
}

/// `<dir>/<prefix>_results_<YYYYmmdd_HHMMSS>.csv` for the current time
pub fn default_results_path(dir: impl AsRef<Path>, prefix: &str) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    dir.as_ref().join(format!("{prefix}_results_{stamp}.csv"))
}
