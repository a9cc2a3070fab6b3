use crate::error::{require_non_blank, BackupError, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Folder name that marks an export root as laid out by JKSV.
const JKSV_ROOT_NAME: &str = "JKSV";

/// A configured save export directory.
///
/// JKSV roots name each title folder `"<Game Title> [<title id>]"`; other
/// roots use the bare title id as the folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRoot {
    root_path: PathBuf,
    is_jksv_style: bool,
}

impl ExportRoot {
    /// Opens an existing export root directory.
    pub fn new(root_path: impl Into<PathBuf>) -> Result<Self> {
        let root_path = root_path.into();
        if !root_path.is_dir() {
            return Err(BackupError::NotFound { path: root_path });
        }

        let is_jksv_style = root_path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.eq_ignore_ascii_case(JKSV_ROOT_NAME));

        log::info!(
            "Using export root {:?} (JKSV layout: {})",
            root_path,
            is_jksv_style
        );

        Ok(Self {
            root_path,
            is_jksv_style,
        })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn is_jksv_style(&self) -> bool {
        self.is_jksv_style
    }

    /// Finds the export folder for a title id among the root's direct subdirectories.
    ///
    /// Returns `Ok(None)` when nothing matches and fails with `AmbiguousMatch`
    /// when more than one folder does.
    pub fn find_export_path(&self, title_id: &str) -> Result<Option<PathBuf>> {
        require_non_blank(title_id, "title_id")?;

        let mut matches = Vec::new();
        for entry in
            fs::read_dir(&self.root_path).map_err(|e| BackupError::io(&self.root_path, e))?
        {
            let entry = entry.map_err(|e| BackupError::io(&self.root_path, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let folder_name = entry.file_name();
            if self.folder_matches(&folder_name.to_string_lossy(), title_id) {
                matches.push(path);
            }
        }

        match matches.len() {
            0 => {
                log::debug!(
                    "No export folder for title {} under {:?}",
                    title_id,
                    self.root_path
                );
                Ok(None)
            }
            1 => {
                let path = matches.remove(0);
                log::debug!("Export folder for title {}: {:?}", title_id, path);
                Ok(Some(path))
            }
            _ => {
                log::warn!(
                    "Title {} matches {} folders under {:?}",
                    title_id,
                    matches.len(),
                    self.root_path
                );
                matches.sort();
                Err(BackupError::AmbiguousMatch {
                    title_id: title_id.to_string(),
                    root: self.root_path.clone(),
                    matches,
                })
            }
        }
    }

    /// Checks whether `path` lies inside this export root.
    ///
    /// The comparison is per path component, and any `..` component counts as
    /// escaping the root.
    pub fn contains(&self, path: &Path) -> bool {
        let escapes = path.components().any(|c| c == Component::ParentDir);
        !escapes && path.starts_with(&self.root_path)
    }

    fn folder_matches(&self, folder_name: &str, title_id: &str) -> bool {
        if self.is_jksv_style {
            folder_name.ends_with(&format!("[{}]", title_id))
        } else {
            folder_name == title_id
        }
    }
}
