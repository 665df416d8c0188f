use std::path::{Path, PathBuf};

pub const EXPORT_FOLDER_SUBSTRING: &str = "iCloud Photos";
pub const DONE_OUTPUT_DIRNAME: &str = "NEW_IMAGES_SORTED";
pub const FINISH_OUTPUT_DIRNAME: &str = "NEW_IMAGES_SORTED_FINISHING";
const IMAGES_DIRNAME: &str = "IMAGES";
const ERRORS_DIRNAME: &str = "ERRORS";
const RECORD_EXTENSION: &str = "csv";
const NAME_COLUMN: &str = "imgName";
const DATE_COLUMN: &str = "originalCreationDate";
const VIDEO_EXTS: &[&str] = &["mov", "mp4", "m4v", "avi", "mts", "m2ts", "3gp", "3gpp"];

/// How to launch exiftool. The stay-open arguments are appended by the session.
#[derive(Debug, Clone)]
pub struct ExifToolCommand {
    pub program: String,
    pub leading_args: Vec<String>,
}

impl Default for ExifToolCommand {
    fn default() -> Self {
        ExifToolCommand {
            program: "exiftool".to_owned(),
            leading_args: Vec::new(),
        }
    }
}

/// Every fixed name the finishing run depends on.
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    /// export folders are immediate children of `root` whose name contains this
    pub export_marker: String,
    pub done_dir_name: String,
    pub finish_dir_name: String,
    pub images_dir_name: String,
    pub errors_dir_name: String,
    pub record_extension: String,
    pub name_column: String,
    pub date_column: String,
    /// lowercase, without the leading dot
    pub video_extensions: Vec<String>,
    pub exiftool: ExifToolCommand,
}

impl Config {
    pub fn new(root: impl Into<PathBuf>) -> Config {
        Config {
            root: root.into(),
            export_marker: EXPORT_FOLDER_SUBSTRING.to_owned(),
            done_dir_name: DONE_OUTPUT_DIRNAME.to_owned(),
            finish_dir_name: FINISH_OUTPUT_DIRNAME.to_owned(),
            images_dir_name: IMAGES_DIRNAME.to_owned(),
            errors_dir_name: ERRORS_DIRNAME.to_owned(),
            record_extension: RECORD_EXTENSION.to_owned(),
            name_column: NAME_COLUMN.to_owned(),
            date_column: DATE_COLUMN.to_owned(),
            video_extensions: VIDEO_EXTS.iter().map(|e| e.to_string()).collect(),
            exiftool: ExifToolCommand::default(),
        }
    }

    pub fn done_images(&self) -> PathBuf {
        self.root.join(&self.done_dir_name).join(&self.images_dir_name)
    }

    pub fn done_errors(&self) -> PathBuf {
        self.root.join(&self.done_dir_name).join(&self.errors_dir_name)
    }

    pub fn finish_root(&self) -> PathBuf {
        self.root.join(&self.finish_dir_name)
    }

    pub fn finish_images(&self) -> PathBuf {
        self.finish_root().join(&self.images_dir_name)
    }

    pub fn finish_errors(&self) -> PathBuf {
        self.finish_root().join(&self.errors_dir_name)
    }

    pub fn is_record_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.record_extension))
    }

    pub fn is_video(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .is_some_and(|ext| self.video_extensions.contains(&ext))
    }
}
