use std::path::PathBuf;

/// Conditions that stop a finishing run outright. Anything that only affects a
/// single item ends up in a ledger instead.
#[derive(Debug, thiserror::Error)]
pub enum FinishError {
    #[error("ExifTool not found on PATH. Install ExifTool and ensure '{program} -ver' works.")]
    ToolNotFound { program: String },
    #[error("ExifTool is not usable: {0}")]
    ToolUnavailable(String),
    #[error("No folders found containing '{marker}' in: {}", .root.display())]
    NoExportFolders { marker: String, root: PathBuf },
    #[error("failed to write ledger {}: {source}", .path.display())]
    Ledger {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
