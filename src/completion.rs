use std::{
    collections::HashSet,
    io::ErrorKind,
    path::Path,
};

use tracing::{debug, warn};

use crate::ledger::PRIOR_FAILURE_LEDGERS;

/// Names a previous run already dealt with, either by producing an output file
/// or by logging a failure for it.
#[derive(Debug, Default)]
pub struct CompletedSet {
    done: HashSet<String>,
    skipped: HashSet<String>,
}

impl CompletedSet {
    pub fn new(done: HashSet<String>, skipped: HashSet<String>) -> CompletedSet {
        CompletedSet { done, skipped }
    }

    /// `header_name` is the first header cell of the prior ledgers; a first row
    /// starting with it is treated as a header rather than an item.
    pub fn load(done_images: &Path, done_errors: &Path, header_name: &str) -> CompletedSet {
        CompletedSet {
            done: read_done_names(done_images),
            skipped: load_skipped_names(done_errors, header_name),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.done.contains(name) || self.skipped.contains(name)
    }

    pub fn done_count(&self) -> usize {
        self.done.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// base names of every file directly inside the previous output directory
pub fn read_done_names(done_images: &Path) -> HashSet<String> {
    let entries = match std::fs::read_dir(done_images) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return HashSet::new(),
        Err(e) => {
            warn!(dir = %done_images.display(), error = %e, "could not list previous output");
            return HashSet::new();
        }
    };

    let mut names = HashSet::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => {
                names.insert(name);
            }
            Err(name) => debug!(?name, "skipping non utf-8 file name"),
        }
    }
    names
}

/// First column of each prior failure ledger that exists.
pub fn load_skipped_names(done_errors: &Path, header_name: &str) -> HashSet<String> {
    let mut skipped = HashSet::new();
    for ledger in PRIOR_FAILURE_LEDGERS {
        let path = done_errors.join(ledger);
        if !path.is_file() {
            continue;
        }

        let mut reader = match csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
        {
            Ok(reader) => reader,
            Err(e) => {
                warn!(ledger = %path.display(), error = %e, "could not open previous ledger");
                continue;
            }
        };

        for (i, record) in reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!(ledger = %path.display(), error = %e, "stopped reading previous ledger");
                    break;
                }
            };
            let Some(name) = record.get(0).map(str::trim) else {
                continue;
            };
            if name.is_empty() || (i == 0 && name == header_name) {
                continue;
            }
            skipped.insert(name.to_owned());
        }
    }
    skipped
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_missing_directories_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let completed = CompletedSet::load(
            &dir.path().join("nope/IMAGES"),
            &dir.path().join("nope/ERRORS"),
            "imgName",
        );
        assert_eq!(completed.done_count(), 0);
        assert_eq!(completed.skipped_count(), 0);
        assert!(!completed.contains("IMG_0001.JPG"));
    }

    #[test]
    fn test_done_names_are_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("IMG_0001.JPG"), b"a").unwrap();
        fs::write(dir.path().join("IMG_0002.MOV"), b"b").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let names = read_done_names(dir.path());
        assert_eq!(names.len(), 2);
        assert!(names.contains("IMG_0001.JPG"));
        assert!(!names.contains("nested"));
    }

    #[test]
    fn test_skipped_names_with_and_without_header() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("CANNOT_BE_FOUND.csv"),
            "imgName,csvFile\nIMG_0003.JPG,/a.csv\n",
        )
        .unwrap();
        // no header row at all
        fs::write(
            dir.path().join("BAD_DATE.csv"),
            "IMG_0004.JPG,garbage,/a.csv\n, ,\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("EXIFTOOL_FAILED.csv"),
            "imgName,exifDate,outputFile,csvFile\n IMG_0005.MOV ,2020:01:01 00:00:00,/o,/a.csv\n",
        )
        .unwrap();
        // not one of the known ledgers
        fs::write(dir.path().join("DUPLICATES.csv"), "IMG_0006.JPG,/x\n").unwrap();

        let skipped = load_skipped_names(dir.path(), "imgName");
        let mut skipped: Vec<_> = skipped.into_iter().collect();
        skipped.sort();
        assert_eq!(skipped, vec!["IMG_0003.JPG", "IMG_0004.JPG", "IMG_0005.MOV"]);
    }

    #[test]
    fn test_contains_checks_both_sources() {
        let completed = CompletedSet::new(
            HashSet::from(["done.jpg".to_owned()]),
            HashSet::from(["failed.jpg".to_owned()]),
        );
        assert!(completed.contains("done.jpg"));
        assert!(completed.contains("failed.jpg"));
        assert!(!completed.contains("other.jpg"));
    }
}
