pub mod create;
pub mod data;
pub mod listing;

#[cfg(test)]
mod tests;

pub use create::{
    create_backup, create_backup_at, default_workers, BackupOptions, CancelToken,
};
pub use data::{sort_newest_first, BackupKind, BackupRecord};
pub use listing::list_backups;
