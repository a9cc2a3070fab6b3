use crate::backup::{BackupKind, BackupRecord};
use crate::error::{BackupError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::Path;

/// Separator between the username and the timestamp in a backup name.
pub const NAME_SEPARATOR: &str = " - ";

/// `chrono` rendering of the `yyyy.MM.dd @ HH.mm.ss` timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y.%m.%d @ %H.%M.%S";

/// Shape of a timestamp: `0` stands for any ASCII digit, everything else is literal.
const TIMESTAMP_SHAPE: &str = "0000.00.00 @ 00.00.00";

const ARCHIVE_SUFFIX: &str = ".zip";

/// Formats a backup folder name as `"<username> - yyyy.MM.dd @ HH.mm.ss"`.
///
/// The username is not validated; it must not contain the separator or
/// characters that are illegal in a path.
pub fn format_backup_name(username: &str, timestamp: DateTime<Utc>) -> String {
    format!(
        "{}{}{}",
        username,
        NAME_SEPARATOR,
        timestamp.format(TIMESTAMP_FORMAT)
    )
}

/// Parses a timestamp that must match `yyyy.MM.dd @ HH.mm.ss` exactly.
///
/// `chrono` alone accepts short years and single digit fields, so the digit
/// layout is checked before handing the string over for range validation.
pub fn parse_backup_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if value.len() != TIMESTAMP_SHAPE.len() {
        return None;
    }

    let shape_matches = value
        .bytes()
        .zip(TIMESTAMP_SHAPE.bytes())
        .all(|(actual, expected)| match expected {
            b'0' => actual.is_ascii_digit(),
            literal => actual == literal,
        });
    if !shape_matches {
        return None;
    }

    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Returns the backup name of a path and whether it points at an archive.
///
/// Archives lose their `.zip` suffix (matched case-insensitively); any other
/// final segment is used as-is, dots included.
pub fn backup_base_name(path: &Path) -> Option<(&str, BackupKind)> {
    let file_name = path.file_name()?.to_str()?;
    let split_at = file_name.len().saturating_sub(ARCHIVE_SUFFIX.len());

    match (file_name.get(..split_at), file_name.get(split_at..)) {
        (Some(stem), Some(suffix)) if suffix.eq_ignore_ascii_case(ARCHIVE_SUFFIX) => {
            Some((stem, BackupKind::Archive))
        }
        _ => Some((file_name, BackupKind::Directory)),
    }
}

/// Parses a backup directory or `.zip` archive path into a [`BackupRecord`].
///
/// The record keeps `path` unchanged.
pub fn parse_backup_path(path: &Path) -> Result<BackupRecord> {
    if path.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(BackupError::format(path, "path is empty"));
    }

    let (name, kind) = backup_base_name(path)
        .ok_or_else(|| BackupError::format(path, "path has no usable final segment"))?;

    let parts: Vec<&str> = name.split(NAME_SEPARATOR).collect();
    let [username, timestamp] = parts.as_slice() else {
        return Err(BackupError::format(
            path,
            format!(
                "expected exactly one \"{}\" separator, found {}",
                NAME_SEPARATOR,
                parts.len() - 1
            ),
        ));
    };

    let username = username.trim();
    let timestamp = timestamp.trim();
    if username.is_empty() {
        return Err(BackupError::format(path, "username is empty"));
    }
    if timestamp.is_empty() {
        return Err(BackupError::format(path, "timestamp is empty"));
    }

    let timestamp = parse_backup_timestamp(timestamp).ok_or_else(|| {
        BackupError::format(path, format!("could not parse timestamp \"{}\"", timestamp))
    })?;

    Ok(BackupRecord {
        path: path.to_path_buf(),
        username: username.to_string(),
        timestamp,
        kind,
    })
}
