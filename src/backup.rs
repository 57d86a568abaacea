//! Timestamped backups colocated with the artifact
//!
//! `Game.dll` is backed up as `Game.dll.2024-03-02_14-05-09.bak`. Any file
//! next to it named `Game.dll.<something>.bak` is treated as a backup; one
//! whose middle part is not a timestamp in [`BACKUP_DATE_FORMAT`] is an error,
//! never skipped.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info};

use binpatch_core::{Error, Result};

pub const BACKUP_DATE_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
pub const BACKUP_SUFFIX: &str = ".bak";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSnapshot {
    pub path: PathBuf,
    pub taken_at: NaiveDateTime,
}

fn file_name(source: &Path) -> Result<String> {
    source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Internal(format!("not a file path: {}", source.display())))
}

/// Destination of a backup of `source` taken at `at`.
pub fn backup_path_for(source: &Path, at: NaiveDateTime) -> Result<PathBuf> {
    let name = format!(
        "{}.{}{}",
        file_name(source)?,
        at.format(BACKUP_DATE_FORMAT),
        BACKUP_SUFFIX
    );
    Ok(source.with_file_name(name))
}

/// Byte-copy the file currently on disk at `source`, stamped with local time.
pub fn create_backup(source: &Path) -> Result<PathBuf> {
    create_backup_at(source, Local::now().naive_local())
}

/// Fails if a backup with the same timestamp already exists.
pub fn create_backup_at(source: &Path, at: NaiveDateTime) -> Result<PathBuf> {
    let dest = backup_path_for(source, at)?;
    let mut from = File::open(source)?;
    let mut to = OpenOptions::new().write(true).create_new(true).open(&dest)?;
    io::copy(&mut from, &mut to)?;
    info!("Created backup {}", dest.display());
    Ok(dest)
}

/// Every backup of `source`, newest first.
pub fn list_backups(source: &Path) -> Result<Vec<BackupSnapshot>> {
    let prefix = format!("{}.", file_name(source)?);
    let dir = match source.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut snapshots = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(stamp) = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(BACKUP_SUFFIX))
        else {
            continue;
        };
        let taken_at = NaiveDateTime::parse_from_str(stamp, BACKUP_DATE_FORMAT).map_err(|e| {
            Error::MalformedBackupName {
                path: entry.path(),
                reason: format!("'{stamp}': {e}"),
            }
        })?;
        snapshots.push(BackupSnapshot {
            path: entry.path(),
            taken_at,
        });
    }

    snapshots.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));
    debug!("{} backup(s) of {}", snapshots.len(), source.display());
    Ok(snapshots)
}

pub fn find_latest(source: &Path) -> Result<Option<BackupSnapshot>> {
    Ok(list_backups(source)?.into_iter().next())
}
