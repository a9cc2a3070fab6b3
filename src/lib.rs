//! Locates per-title save exports and creates timestamped backups of them.
//!
//! Backups live under an export root as
//! `<export root>/<title folder>/<username> - yyyy.MM.dd @ HH.mm.ss[.zip]`,
//! where the title folder is either the bare title id or, for JKSV roots,
//! any name ending in `[<title id>]`.

pub mod backup;
pub mod config;
pub mod error;
pub mod export_root;
pub mod filename_utils;

pub use backup::{
    create_backup, create_backup_at, list_backups, sort_newest_first, BackupKind, BackupOptions,
    BackupRecord, CancelToken,
};
pub use config::AppConfig;
pub use error::{BackupError, Result};
pub use export_root::ExportRoot;
pub use filename_utils::{format_backup_name, parse_backup_path};
