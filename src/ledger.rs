use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::FinishError;

pub const DUPLICATES_LEDGER: &str = "DUPLICATES.csv";
pub const MISSING_LEDGER: &str = "CANNOT_BE_FOUND.csv";
pub const BAD_DATE_LEDGER: &str = "BAD_DATE.csv";
pub const STAMP_FAILED_LEDGER: &str = "EXIFTOOL_FAILED.csv";

/// Ledgers from an earlier run whose names are not attempted again.
pub const PRIOR_FAILURE_LEDGERS: [&str; 3] = [MISSING_LEDGER, BAD_DATE_LEDGER, STAMP_FAILED_LEDGER];

const DUPLICATES_HEADER: &[&str] = &["imgName", "path"];

pub trait LedgerRow: Serialize {
    const HEADER: &'static [&'static str];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingRow {
    pub name: String,
    pub csv_file: String,
}

impl LedgerRow for MissingRow {
    const HEADER: &'static [&'static str] = &["imgName", "csvFile"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadDateRow {
    pub name: String,
    pub raw_date: String,
    pub csv_file: String,
}

impl LedgerRow for BadDateRow {
    const HEADER: &'static [&'static str] = &["imgName", "rawDate", "csvFile"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StampFailedRow {
    pub name: String,
    pub exif_date: String,
    pub output_file: String,
    pub csv_file: String,
}

impl LedgerRow for StampFailedRow {
    const HEADER: &'static [&'static str] = &["imgName", "exifDate", "outputFile", "csvFile"];
}

/// Per-item failures collected while processing, written out once at the end.
#[derive(Debug, Default)]
pub struct Ledgers {
    pub missing: Vec<MissingRow>,
    pub bad_date: Vec<BadDateRow>,
    pub stamp_failed: Vec<StampFailedRow>,
}

impl Ledgers {
    pub fn write_all(&self, errors_dir: &Path) -> Result<(), FinishError> {
        write_ledger(&errors_dir.join(MISSING_LEDGER), &self.missing)?;
        write_ledger(&errors_dir.join(BAD_DATE_LEDGER), &self.bad_date)?;
        write_ledger(&errors_dir.join(STAMP_FAILED_LEDGER), &self.stamp_failed)?;
        Ok(())
    }
}

fn ledger_error(path: &Path) -> impl Fn(csv::Error) -> FinishError + '_ {
    move |source| FinishError::Ledger {
        path: path.to_path_buf(),
        source,
    }
}

/// Header row first, even when there are no rows.
pub fn write_ledger<T: LedgerRow>(path: &Path, rows: &[T]) -> Result<(), FinishError> {
    let wrap = ledger_error(path);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(&wrap)?;
    writer.write_record(T::HEADER).map_err(&wrap)?;
    for row in rows {
        writer.serialize(row).map_err(&wrap)?;
    }
    writer.flush().map_err(|e| wrap(e.into()))?;
    Ok(())
}

/// One row per name: `name,path` repeated for every candidate.
pub fn write_duplicates<'a>(
    path: &Path,
    duplicates: impl IntoIterator<Item = (&'a str, &'a [PathBuf])>,
) -> Result<(), FinishError> {
    let wrap = ledger_error(path);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(&wrap)?;
    writer.write_record(DUPLICATES_HEADER).map_err(&wrap)?;
    for (name, paths) in duplicates {
        let mut row = Vec::with_capacity(paths.len() * 2);
        for path in paths {
            row.push(name.to_owned());
            row.push(path.display().to_string());
        }
        writer.write_record(&row).map_err(&wrap)?;
    }
    writer.flush().map_err(|e| wrap(e.into()))?;
    Ok(())
}
