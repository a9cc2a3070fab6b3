use crate::error::{require_non_blank, require_non_blank_path, BackupError, Result};
use crate::export_root::ExportRoot;
use crate::filename_utils;
use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use walkdir::WalkDir;

/// Upper bound on the default number of copy workers.
const MAX_DEFAULT_WORKERS: usize = 8;

/// Shared flag that stops a running backup before its next file copy.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Tuning for a single backup run.
#[derive(Debug, Clone)]
pub struct BackupOptions {
    /// Number of threads copying files; 0 is treated as 1.
    pub workers: usize,
    /// Remove the new backup directory again if any copy fails or the run is cancelled.
    pub cleanup_on_failure: bool,
    pub cancel: Option<CancelToken>,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            cleanup_on_failure: false,
            cancel: None,
        }
    }
}

/// Available parallelism, capped at [`MAX_DEFAULT_WORKERS`].
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_DEFAULT_WORKERS)
}

/// Snapshots `save_game_dir` into a new `"<username> - <now>"` folder under `backup_root_dir`.
pub fn create_backup(
    export_root: &ExportRoot,
    save_game_dir: &Path,
    backup_root_dir: &Path,
    username: &str,
) -> Result<PathBuf> {
    create_backup_at(
        export_root,
        save_game_dir,
        backup_root_dir,
        username,
        Utc::now(),
        &BackupOptions::default(),
    )
}

/// Snapshots `save_game_dir` using an explicit timestamp and options.
///
/// Every file below `save_game_dir` is copied flat into the new backup
/// folder, so nested folders are not recreated. Files are never overwritten:
/// two save files sharing a name fail the backup with `AlreadyExists`.
///
/// Symlinked files are copied by content; symlinked folders are skipped
/// with a warning.
///
/// `backup_root_dir` must lie inside the export root by whole path
/// components, and any `..` component is refused. A sibling such as
/// `/exports/JKSV2` is out of scope for the root `/exports/JKSV` even though
/// it shares the same string prefix.
///
/// The copy is not transactional. Unless `cleanup_on_failure` is set, a
/// failed run leaves the partially filled backup folder behind.
pub fn create_backup_at(
    export_root: &ExportRoot,
    save_game_dir: &Path,
    backup_root_dir: &Path,
    username: &str,
    timestamp: DateTime<Utc>,
    options: &BackupOptions,
) -> Result<PathBuf> {
    require_non_blank_path(save_game_dir, "save_game_dir")?;
    require_non_blank_path(backup_root_dir, "backup_root_dir")?;
    require_non_blank(username, "username")?;

    if !export_root.contains(backup_root_dir) {
        return Err(BackupError::OutOfScope {
            path: backup_root_dir.to_path_buf(),
            root: export_root.root_path().to_path_buf(),
        });
    }

    if !save_game_dir.is_dir() {
        return Err(BackupError::NotFound {
            path: save_game_dir.to_path_buf(),
        });
    }

    // Enumerate first so a backup root nested in the save folder is never copied into itself.
    let save_files = collect_save_files(save_game_dir)?;

    ensure_backup_root(backup_root_dir)?;
    let folder_name = filename_utils::format_backup_name(username, timestamp);
    let target_dir = create_target_dir(backup_root_dir, &folder_name)?;

    log::info!(
        "Copying {} save files to {:?}",
        save_files.len(),
        target_dir
    );

    match copy_save_files(&save_files, &target_dir, options) {
        Ok(()) => {
            log::info!("Backup created at {:?}", target_dir);
            Ok(target_dir)
        }
        Err(e) => {
            log::error!("Backup into {:?} failed: {}", target_dir, e);
            if options.cleanup_on_failure {
                remove_partial_backup(&target_dir);
            }
            Err(e)
        }
    }
}

/// Creates the backup root directory if it is missing.
fn ensure_backup_root(backup_root_dir: &Path) -> Result<()> {
    if !backup_root_dir.is_dir() {
        fs::create_dir_all(backup_root_dir).map_err(|e| BackupError::io(backup_root_dir, e))?;
        log::info!("Created backup root {:?}", backup_root_dir);
    }
    Ok(())
}

/// Creates the target backup directory and returns its path.
///
/// Fails with `AlreadyExists` if a backup with the same name is already there.
fn create_target_dir(backup_root_dir: &Path, folder_name: &str) -> Result<PathBuf> {
    let target_dir = backup_root_dir.join(folder_name);
    fs::create_dir(&target_dir).map_err(|e| BackupError::io(&target_dir, e))?;
    Ok(target_dir)
}

/// Lists every file below `save_game_dir`, recursively.
///
/// Symlinks to regular files are kept and copied by content. Anything else
/// that is not a regular file is skipped with a warning.
fn collect_save_files(save_game_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(save_game_dir)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| BackupError::Walk {
            path: save_game_dir.to_path_buf(),
            source,
        })?;
        let file_type = entry.file_type();
        if file_type.is_file() {
            files.push(entry.into_path());
        } else if file_type.is_symlink() {
            match fs::metadata(entry.path()) {
                Ok(target) if target.is_file() => files.push(entry.into_path()),
                Ok(_) => log::warn!(
                    "Skipping {:?}: symlink does not point at a file",
                    entry.path()
                ),
                Err(e) => log::warn!("Skipping broken symlink {:?}: {}", entry.path(), e),
            }
        } else if !file_type.is_dir() {
            log::warn!("Skipping {:?}: not a regular file", entry.path());
        }
    }
    Ok(files)
}

/// Copies files into `target_dir` on a bounded pool of scoped threads.
///
/// Workers pull the next file index from a shared counter. The first failure
/// (or a cancellation) stops workers from starting new copies; copies already
/// running are allowed to finish before the first error is returned.
fn copy_save_files(files: &[PathBuf], target_dir: &Path, options: &BackupOptions) -> Result<()> {
    let workers = options.workers.clamp(1, files.len().max(1));
    let next = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let first_error: Mutex<Option<BackupError>> = Mutex::new(None);

    let record_failure = |error: BackupError| {
        stop.store(true, Ordering::SeqCst);
        let mut slot = first_error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(error);
        }
    };

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                if options.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                    log::warn!("Backup into {:?} cancelled", target_dir);
                    record_failure(BackupError::Cancelled {
                        path: target_dir.to_path_buf(),
                    });
                    break;
                }

                let Some(source) = files.get(next.fetch_add(1, Ordering::SeqCst)) else {
                    break;
                };
                if let Err(e) = copy_save_file(source, target_dir) {
                    log::warn!("Failed to copy {:?}: {}", source, e);
                    record_failure(e);
                    break;
                }
            });
        }
    });

    match first_error
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
    {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Copies one file into `target_dir` under its own file name, refusing to overwrite.
fn copy_save_file(source: &Path, target_dir: &Path) -> Result<()> {
    let file_name = source.file_name().ok_or_else(|| BackupError::NotFound {
        path: source.to_path_buf(),
    })?;
    let destination = target_dir.join(file_name);

    let mut reader = File::open(source).map_err(|e| BackupError::io(source, e))?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&destination)
        .map_err(|e| BackupError::io(&destination, e))?;
    io::copy(&mut reader, &mut writer).map_err(|e| BackupError::io(&destination, e))?;

    let permissions = reader
        .metadata()
        .map_err(|e| BackupError::io(source, e))?
        .permissions();
    fs::set_permissions(&destination, permissions)
        .map_err(|e| BackupError::io(&destination, e))?;
    Ok(())
}

/// Deletes a partially populated backup folder, logging instead of failing.
fn remove_partial_backup(target_dir: &Path) {
    match fs::remove_dir_all(target_dir) {
        Ok(()) => log::warn!("Removed partial backup {:?}", target_dir),
        Err(e) => log::error!(
            "Failed to remove partial backup {:?}: {}",
            target_dir,
            e
        ),
    }
}
