use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Naming convention shown to the user when a backup name cannot be parsed.
pub const BACKUP_NAME_CONVENTION: &str = "<username> - yyyy.MM.dd @ HH.mm.ss";

/// Errors raised while locating exports and creating or listing backups.
#[derive(Debug, Error)]
pub enum BackupError {
    /// An input was empty or whitespace only.
    #[error("{name} cannot be empty or whitespace")]
    InvalidArgument { name: &'static str },

    /// A backup folder or archive name does not follow the naming convention.
    #[error(
        "{path:?} is not a valid backup name ({reason}), expected \"{convention}\"",
        convention = BACKUP_NAME_CONVENTION
    )]
    Format { path: PathBuf, reason: String },

    /// An expected directory or file is missing.
    #[error("{path:?} does not exist or is not a directory")]
    NotFound { path: PathBuf },

    /// More than one folder under the export root matches a title id.
    #[error("title id {title_id} matches more than one folder under {root:?}: {matches:?}")]
    AmbiguousMatch {
        title_id: String,
        root: PathBuf,
        matches: Vec<PathBuf>,
    },

    /// A target path escapes the configured export root.
    #[error("{path:?} is not under the export root {root:?}")]
    OutOfScope { path: PathBuf, root: PathBuf },

    /// The target of a create or copy already exists.
    #[error("{path:?} already exists")]
    AlreadyExists { path: PathBuf },

    /// A filesystem operation failed on the given path.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Walking the save folder failed.
    #[error("failed to enumerate save files under {path:?}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// The backup was cancelled before every file was copied.
    #[error("backup into {path:?} was cancelled")]
    Cancelled { path: PathBuf },

    /// The configuration could not be serialized for writing.
    #[error("failed to serialize configuration for {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl BackupError {
    /// Wraps an I/O error with the path it concerns, keeping `AlreadyExists` distinct.
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::AlreadyExists {
            Self::AlreadyExists { path }
        } else {
            Self::Io { path, source }
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BackupError>;

/// Fails with `InvalidArgument` when `value` is empty or whitespace only.
pub(crate) fn require_non_blank(value: &str, name: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BackupError::InvalidArgument { name });
    }
    Ok(())
}

/// Path flavour of [`require_non_blank`].
pub(crate) fn require_non_blank_path(path: &Path, name: &'static str) -> Result<()> {
    require_non_blank(&path.as_os_str().to_string_lossy(), name)
}
