use std::{collections::HashMap, path::PathBuf};

use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::{catalog::Catalog, config::Config, progress};

/// Immediate children of the root whose name contains the export marker.
pub fn find_export_folders(config: &Config) -> std::io::Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    for entry in std::fs::read_dir(&config.root)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.contains(&config.export_marker));
        if matches {
            folders.push(path);
        }
    }
    folders.sort();
    Ok(folders)
}

/// Every path whose base name is a remaining item, keyed by that name.
#[derive(Debug, Default)]
pub struct LocatedPaths {
    paths: HashMap<String, Vec<PathBuf>>,
}

impl LocatedPaths {
    pub fn push(&mut self, name: &str, path: PathBuf) {
        self.paths.entry(name.to_owned()).or_default().push(path);
    }

    /// empty for names that were never found
    pub fn candidates(&self, name: &str) -> &[PathBuf] {
        self.paths.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Names with more than one candidate, in catalog order.
    pub fn duplicates<'a>(&'a self, catalog: &'a Catalog) -> Vec<(&'a str, &'a [PathBuf])> {
        catalog
            .records()
            .iter()
            .map(|record| (record.name.as_str(), self.candidates(&record.name)))
            .filter(|(_, paths)| paths.len() > 1)
            .collect()
    }

    /// number of names with at least one candidate
    pub fn found(&self) -> usize {
        self.paths.len()
    }
}

fn is_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}

/// One pass over every export folder; only names in `catalog` are recorded.
pub fn locate_files(folders: &[PathBuf], catalog: &Catalog, config: &Config) -> LocatedPaths {
    let mut located = LocatedPaths::default();
    let pb = progress::bar(folders.len(), "Scanning export folders for remaining files");

    for folder in folders {
        pb.inc(1);
        let mut seen = 0usize;
        for entry in WalkDir::new(folder).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !is_file(&entry) || config.is_record_file(entry.path()) {
                continue;
            }
            seen += 1;

            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if catalog.contains(name) {
                located.push(name, entry.path().to_path_buf());
            }
        }
        debug!(folder = %folder.display(), files = seen, "export folder scanned");
    }
    pb.finish_and_clear();

    info!(
        remaining = catalog.len(),
        found = located.found(),
        "export folder scan finished"
    );
    located
}
