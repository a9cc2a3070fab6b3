use super::data::{BackupKind, BackupRecord};
use crate::error::{require_non_blank_path, BackupError, Result};
use crate::filename_utils;
use std::fs;
use std::path::Path;

/// Lists every backup folder and `.zip` archive directly under a game folder.
///
/// Records come back in filesystem enumeration order. The first entry whose
/// name does not follow the backup naming convention fails the whole call.
pub fn list_backups(game_folder: &Path) -> Result<Vec<BackupRecord>> {
    require_non_blank_path(game_folder, "game_folder")?;
    if !game_folder.is_dir() {
        return Err(BackupError::NotFound {
            path: game_folder.to_path_buf(),
        });
    }

    let mut backups = Vec::new();

    for entry in fs::read_dir(game_folder).map_err(|e| BackupError::io(game_folder, e))? {
        let entry = entry.map_err(|e| BackupError::io(game_folder, e))?;
        let path = entry.path();

        if path.is_dir() {
            // A folder stays a folder even when its name ends in `.zip`.
            let mut record = filename_utils::parse_backup_path(&path)?;
            record.kind = BackupKind::Directory;
            backups.push(record);
        } else if path.is_file() && is_zip_archive(&path) {
            backups.push(filename_utils::parse_backup_path(&path)?);
        }
    }

    log::debug!(
        "Found {} backup(s) under {:?}",
        backups.len(),
        game_folder
    );

    Ok(backups)
}

/// Checks for a `.zip` extension, ignoring case.
fn is_zip_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}
