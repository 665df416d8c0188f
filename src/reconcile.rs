use std::{
    fs,
    path::{Path, PathBuf},
};

use filetime::FileTime;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    catalog::{self, Catalog, SourceRecord},
    completion::CompletedSet,
    config::Config,
    date::parse_catalog_date,
    error::FinishError,
    ledger::{self, BadDateRow, Ledgers, MissingRow, StampFailedRow, DUPLICATES_LEDGER},
    locator::{self, LocatedPaths},
    progress,
    stamper::StampSession,
};

/// Where a remaining item ended up. Exactly one per item per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Processed,
    Duplicate,
    Missing,
    BadDate,
    StampFailed,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub already_done: usize,
    pub previously_skipped: usize,
    pub remaining: usize,
    pub processed: usize,
    pub duplicates: usize,
    pub missing: usize,
    pub bad_date: usize,
    pub stamp_failed: usize,
}

impl Summary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Processed => self.processed += 1,
            Outcome::Duplicate => self.duplicates += 1,
            Outcome::Missing => self.missing += 1,
            Outcome::BadDate => self.bad_date += 1,
            Outcome::StampFailed => self.stamp_failed += 1,
        }
    }
}

/// Finishing an interrupted export:
/// 1. Treat everything in the previous output (and its error ledgers) as done
/// 2. Read every catalog, keeping only names that are not done
/// 3. Walk the export folders once, collecting paths for those names
/// 4. Write out names found more than once, they are left for a human
/// 5. Copy each remaining file, then stamp its catalog date with exiftool
/// 6. Write the missing/bad date/exiftool failure ledgers
#[derive(Debug)]
pub struct Finisher {
    config: Config,
    export_folders: Vec<PathBuf>,
    completed: CompletedSet,
    catalog: Catalog,
    located: LocatedPaths,
    ledgers: Ledgers,
    summary: Summary,
}

impl Finisher {
    /// Creates the output directories and finds the export folders.
    pub fn new(config: Config) -> Result<Finisher, FinishError> {
        fs::create_dir_all(config.finish_images())?;
        fs::create_dir_all(config.finish_errors())?;

        let export_folders = locator::find_export_folders(&config)?;
        if export_folders.is_empty() {
            return Err(FinishError::NoExportFolders {
                marker: config.export_marker.clone(),
                root: config.root.clone(),
            });
        }
        info!(count = export_folders.len(), "found export folders");

        Ok(Finisher {
            config,
            export_folders,
            completed: CompletedSet::default(),
            catalog: Catalog::default(),
            located: LocatedPaths::default(),
            ledgers: Ledgers::default(),
            summary: Summary::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn ledgers(&self) -> &Ledgers {
        &self.ledgers
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn remaining(&self) -> usize {
        self.catalog.len()
    }

    pub fn load_completed(&mut self) {
        self.completed = CompletedSet::load(
            &self.config.done_images(),
            &self.config.done_errors(),
            &self.config.name_column,
        );
        self.summary.already_done = self.completed.done_count();
        self.summary.previously_skipped = self.completed.skipped_count();
        info!(
            done = self.summary.already_done,
            skipped = self.summary.previously_skipped,
            "loaded previous run"
        );
    }

    pub fn scan_catalogs(&mut self) {
        let files = catalog::find_record_files(&self.config.root, &self.config);
        self.catalog = catalog::scan_catalogs(&files, &self.config, &self.completed);
        self.summary.remaining = self.catalog.len();
    }

    pub fn locate_files(&mut self) {
        self.located = locator::locate_files(&self.export_folders, &self.catalog, &self.config);
    }

    /// Written before anything is copied, so it is complete even if the run dies.
    pub fn write_duplicates(&self) -> Result<(), FinishError> {
        let duplicates = self.located.duplicates(&self.catalog);
        if !duplicates.is_empty() {
            warn!(count = duplicates.len(), "names found more than once");
        }
        ledger::write_duplicates(
            &self.config.finish_errors().join(DUPLICATES_LEDGER),
            duplicates,
        )
    }

    /// Copy and stamp every remaining item, in catalog order.
    pub fn process<S: StampSession>(&mut self, session: &mut S) {
        let images_dir = self.config.finish_images();
        let pb = progress::bar(self.catalog.len(), "Copying + stamping remaining");

        for record in self.catalog.records() {
            pb.inc(1);
            let outcome = finish_item(
                &self.config,
                &images_dir,
                record,
                self.located.candidates(&record.name),
                session,
                &mut self.ledgers,
            );
            debug!(name = %record.name, ?outcome, "item finished");
            self.summary.record(outcome);
        }
        pb.finish_and_clear();

        info!(
            processed = self.summary.processed,
            duplicates = self.summary.duplicates,
            missing = self.summary.missing,
            bad_date = self.summary.bad_date,
            stamp_failed = self.summary.stamp_failed,
            "processing finished"
        );
    }

    pub fn write_ledgers(&self) -> Result<(), FinishError> {
        self.ledgers.write_all(&self.config.finish_errors())
    }
}

fn finish_item<S: StampSession>(
    config: &Config,
    images_dir: &Path,
    record: &SourceRecord,
    candidates: &[PathBuf],
    session: &mut S,
    ledgers: &mut Ledgers,
) -> Outcome {
    let csv_file = record.catalog.display().to_string();

    let src = match candidates {
        [] => {
            ledgers.missing.push(MissingRow {
                name: record.name.clone(),
                csv_file,
            });
            return Outcome::Missing;
        }
        [src] => src,
        // already in the duplicates ledger
        _ => return Outcome::Duplicate,
    };

    let dst = images_dir.join(&record.name);
    if let Err(e) = safe_copy(src, &dst) {
        warn!(src = %src.display(), error = %e, "copy failed");
        ledgers.missing.push(MissingRow {
            name: record.name.clone(),
            csv_file,
        });
        return Outcome::Missing;
    }

    let exif_date = match parse_catalog_date(&record.raw_date) {
        Ok(exif_date) => exif_date,
        Err(e) => {
            debug!(name = %record.name, error = %e, "bad date");
            ledgers.bad_date.push(BadDateRow {
                name: record.name.clone(),
                raw_date: record.raw_date.clone(),
                csv_file,
            });
            return Outcome::BadDate;
        }
    };

    if !session.submit(&stamp_args(config, &exif_date, &dst)) {
        ledgers.stamp_failed.push(StampFailedRow {
            name: record.name.clone(),
            exif_date,
            output_file: dst.display().to_string(),
            csv_file,
        });
        return Outcome::StampFailed;
    }

    Outcome::Processed
}

/// exiftool arguments setting every capture date field for `dst`.
pub fn stamp_args(config: &Config, exif_date: &str, dst: &Path) -> Vec<String> {
    let tags: &[&str] = if config.is_video(dst) {
        &["CreateDate", "MediaCreateDate", "TrackCreateDate"]
    } else {
        &["DateTimeOriginal", "CreateDate"]
    };

    let mut args = Vec::with_capacity(tags.len() + 2);
    args.push("-overwrite_original".to_owned());
    for tag in tags {
        args.push(format!("-{}={}", tag, exif_date));
    }
    args.push(dst.display().to_string());
    args
}

/// Copies `src` to `dst` unless `dst` already exists. Returns whether a copy
/// happened.
pub fn safe_copy(src: &Path, dst: &Path) -> std::io::Result<bool> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    if dst.exists() {
        return Ok(false);
    }
    fs::copy(src, dst)?;
    copy_file_times(src, dst);
    Ok(true)
}

fn copy_file_times(src: &Path, dst: &Path) {
    let metadata = match fs::metadata(src) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!(src = %src.display(), error = %e, "could not read source times");
            return;
        }
    };
    let atime = FileTime::from_last_access_time(&metadata);
    let mtime = FileTime::from_last_modification_time(&metadata);
    if let Err(e) = filetime::set_file_times(dst, atime, mtime) {
        warn!(dst = %dst.display(), error = %e, "could not copy file times");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_stamp_args() {
        let config = Config::new("/photos");
        assert_eq!(
            stamp_args(
                &config,
                "2024:03:05 10:15:00",
                Path::new("/out/IMAGES/IMG_0001.JPG")
            ),
            vec![
                "-overwrite_original",
                "-DateTimeOriginal=2024:03:05 10:15:00",
                "-CreateDate=2024:03:05 10:15:00",
                "/out/IMAGES/IMG_0001.JPG",
            ]
        );
    }

    #[test]
    fn test_video_stamp_args() {
        let config = Config::new("/photos");
        assert_eq!(
            stamp_args(
                &config,
                "2023:01:02 15:45:00",
                Path::new("/out/IMAGES/IMG_0002.MOV")
            ),
            vec![
                "-overwrite_original",
                "-CreateDate=2023:01:02 15:45:00",
                "-MediaCreateDate=2023:01:02 15:45:00",
                "-TrackCreateDate=2023:01:02 15:45:00",
                "/out/IMAGES/IMG_0002.MOV",
            ]
        );
    }

    #[test]
    fn test_safe_copy_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.jpg");
        let dst = dir.path().join("out/IMAGES/src.jpg");
        fs::write(&src, b"new bytes").unwrap();

        assert!(safe_copy(&src, &dst).unwrap());
        assert_eq!(fs::read(&dst).unwrap(), b"new bytes");

        fs::write(&dst, b"stamped already").unwrap();
        assert!(!safe_copy(&src, &dst).unwrap());
        assert_eq!(fs::read(&dst).unwrap(), b"stamped already");
    }

    #[test]
    fn test_safe_copy_keeps_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.jpg");
        let dst = dir.path().join("dst.jpg");
        fs::write(&src, b"bytes").unwrap();
        let then = FileTime::from_unix_time(1_500_000_000, 0);
        filetime::set_file_mtime(&src, then).unwrap();

        safe_copy(&src, &dst).unwrap();
        let copied = FileTime::from_last_modification_time(&fs::metadata(&dst).unwrap());
        assert_eq!(copied, then);
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("dst.jpg");
        assert!(safe_copy(&dir.path().join("gone.jpg"), &dst).is_err());
        assert!(!dst.exists());
    }
}
