use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::{completion::CompletedSet, config::Config, progress};

/// Where an item's desired capture date came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub name: String,
    pub raw_date: String,
    pub catalog: PathBuf,
}

/// Remaining items in the order their catalog rows were first seen.
#[derive(Debug, Default)]
pub struct Catalog {
    records: Vec<SourceRecord>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Returns false (and keeps the existing record) if the name was already seen.
    pub fn insert(&mut self, record: SourceRecord) -> bool {
        if self.index.contains_key(&record.name) {
            return false;
        }
        self.index.insert(record.name.clone(), self.records.len());
        self.records.push(record);
        true
    }

    pub fn get(&self, name: &str) -> Option<&SourceRecord> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn raw_date(&self, name: &str) -> Option<&str> {
        self.get(name).map(|r| r.raw_date.as_str())
    }

    pub fn origin(&self, name: &str) -> Option<&Path> {
        self.get(name).map(|r| r.catalog.as_path())
    }

    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Every record file anywhere below `root`, in a stable order.
pub fn find_record_files(root: &Path, config: &Config) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && config.is_record_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

/// `(name, raw date)` for every row, or `None` if the file lacks either column.
///
/// The whole file is read before anything is returned, so a file that breaks
/// halfway through contributes nothing.
pub fn read_catalog_file(
    path: &Path,
    name_column: &str,
    date_column: &str,
) -> Result<Option<Vec<(String, String)>>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers = reader.headers()?;
    let name_idx = headers.iter().position(|h| h == name_column);
    let date_idx = headers.iter().position(|h| h == date_column);
    let (Some(name_idx), Some(date_idx)) = (name_idx, date_idx) else {
        return Ok(None);
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let name = record.get(name_idx).unwrap_or_default().trim();
        let raw_date = record.get(date_idx).unwrap_or_default().trim();
        rows.push((name.to_owned(), raw_date.to_owned()));
    }
    Ok(Some(rows))
}

/// Build the remaining work set from every catalog file, leaving out anything
/// `completed` already covers.
pub fn scan_catalogs(files: &[PathBuf], config: &Config, completed: &CompletedSet) -> Catalog {
    let mut catalog = Catalog::default();
    let pb = progress::bar(files.len(), "Scanning CSVs for remaining items");

    for file in files {
        pb.inc(1);
        let rows = match read_catalog_file(file, &config.name_column, &config.date_column) {
            Ok(Some(rows)) => rows,
            Ok(None) => {
                debug!(file = %file.display(), "not a catalog, skipping");
                continue;
            }
            Err(e) => {
                debug!(file = %file.display(), error = %e, "unreadable catalog, skipping");
                continue;
            }
        };

        for (name, raw_date) in rows {
            if name.is_empty() || completed.contains(&name) {
                continue;
            }
            catalog.insert(SourceRecord {
                name,
                raw_date,
                catalog: file.clone(),
            });
        }
    }
    pb.finish_and_clear();

    info!(files = files.len(), remaining = catalog.len(), "catalog scan finished");
    catalog
}
