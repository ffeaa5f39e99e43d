//! Timestamped backups of a config file, taken before every change.
//!
//! A backup of `dir/config` is written next to it as
//! `dir/config.<YYYYmmddHHMMSS>.bak`. A second backup within the same second
//! gets a sequence suffix (`config.<stamp>_001.bak`), which sorts after the
//! plain name, so the greatest file name is always the newest backup.

use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::codec;
use crate::error::{Error, Result};

const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const STAMP_LEN: usize = 14;
const SUFFIX: &str = ".bak";
const MAX_SEQUENCE: u32 = 999;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The config this is a backup of.
    pub source: PathBuf,
    pub path: PathBuf,
    /// `None` for backups whose name doesn't carry a readable time.
    pub timestamp: Option<NaiveDateTime>,
}

fn split(source: &Path) -> io::Result<(&Path, &str)> {
    let base = source.file_name().and_then(OsStr::to_str).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "config path has no UTF-8 file name",
        )
    })?;
    let dir = match source.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    Ok((dir, base))
}

/// The stamp of `file_name` if it is a backup of `base`.
fn stamp_of<'a>(file_name: &'a str, base: &str) -> Option<&'a str> {
    let stamp = file_name
        .strip_prefix(base)?
        .strip_prefix('.')?
        .strip_suffix(SUFFIX)?;
    let starts_with_digit = stamp.chars().next()?.is_ascii_digit();
    let valid = stamp.chars().all(|c| c.is_ascii_digit() || c == '_');
    (starts_with_digit && valid).then(|| stamp)
}

fn parse_stamp(stamp: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(stamp.get(..STAMP_LEN)?, STAMP_FORMAT).ok()
}

fn create_new(path: &Path) -> io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

impl Snapshot {
    /// Copy the current bytes of `source` into a new backup file.
    pub fn take(source: &Path) -> Result<Snapshot> {
        Snapshot::take_at(source, Local::now().naive_local())
    }

    pub fn take_at(source: &Path, now: NaiveDateTime) -> Result<Snapshot> {
        let backup_error = |e: io::Error| Error::Backup {
            path: source.to_owned(),
            source: e,
        };

        let bytes = fs::read(source).map_err(backup_error)?;
        let (dir, base) = split(source).map_err(backup_error)?;
        let newest = Snapshot::latest(source)
            .map_err(|e| match e {
                Error::Io { source: err, .. } => backup_error(err),
                other => other,
            })?
            .and_then(|snapshot| snapshot.file_name().map(str::to_owned));
        let is_stale =
            |name: &str| newest.as_deref().map_or(false, |newest| name <= newest);

        let mut stamp = now.format(STAMP_FORMAT).to_string();
        if is_stale(&format!("{base}.{stamp}{SUFFIX}")) {
            // Clock went backwards; continue the sequence of the newest backup.
            let newest_stamp = newest.as_deref().and_then(|name| stamp_of(name, base));
            if let Some(newest_stamp) = newest_stamp {
                warn!(%stamp, newest = newest_stamp, "clock is behind the newest backup");
                stamp = newest_stamp
                    .split('_')
                    .next()
                    .unwrap_or(newest_stamp)
                    .to_owned();
            }
        }

        for sequence in 0..=MAX_SEQUENCE {
            let name = match sequence {
                0 => format!("{base}.{stamp}{SUFFIX}"),
                n => format!("{base}.{stamp}_{n:03}{SUFFIX}"),
            };
            if is_stale(&name) {
                continue;
            }
            let path = dir.join(name);
            let mut file = match create_new(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(backup_error(e)),
            };
            if let Err(e) = file.write_all(&bytes).and_then(|()| file.sync_all()) {
                drop(file);
                let _ = fs::remove_file(&path);
                return Err(backup_error(e));
            }
            info!(backup = %path.display(), "created backup");
            return Ok(Snapshot {
                source: source.to_owned(),
                timestamp: parse_stamp(&stamp),
                path,
            });
        }

        Err(backup_error(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "too many backups within one second",
        )))
    }

    fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(OsStr::to_str)
    }

    /// All backups of `source`, oldest first.
    pub fn list(source: &Path) -> Result<Vec<Snapshot>> {
        let (dir, base) =
            split(source).map_err(|e| Error::io("invalid config path", source, e))?;
        let read_dir = match fs::read_dir(dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io("failed to list backups in", dir, e)),
        };

        let mut snapshots = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| Error::io("failed to list backups in", dir, e))?;
            let file_name = entry.file_name();
            let stamp = match file_name.to_str().and_then(|name| stamp_of(name, base)) {
                Some(stamp) => stamp,
                None => continue,
            };
            snapshots.push(Snapshot {
                source: source.to_owned(),
                path: entry.path(),
                timestamp: parse_stamp(stamp),
            });
        }
        snapshots.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        debug!(config = %source.display(), count = snapshots.len(), "found backups");
        Ok(snapshots)
    }

    pub fn latest(source: &Path) -> Result<Option<Snapshot>> {
        Ok(Snapshot::list(source)?.pop())
    }

    /// Copy this backup's bytes over its source. The source is never parsed.
    pub fn restore(&self) -> Result<()> {
        let bytes =
            fs::read(&self.path).map_err(|e| Error::io("failed to read", &self.path, e))?;
        codec::write_atomic(&self.source, &bytes)
    }
}

pub fn snapshot(path: &Path) -> Result<Snapshot> {
    Snapshot::take(path)
}

/// Restore the newest backup of `path` and return the backup's path.
///
/// The state being overwritten is not backed up itself, so rolling back twice
/// restores the same backup twice.
pub fn rollback(path: &Path) -> Result<PathBuf> {
    let latest = Snapshot::latest(path)?.ok_or_else(|| Error::NoBackupFound(path.to_owned()))?;
    latest.restore()?;
    info!(config = %path.display(), backup = %latest.path.display(), "rolled back");
    Ok(latest.path)
}
