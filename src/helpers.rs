//! Small helpers shared by the registry, metadata and command layers.

use crate::errors::{CoreError, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::env;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;

/// File extension used by trash info files.
pub const TRASHINFO_EXTENSION: &str = ".trashinfo";

/// Deletion date format used by trash info metadata.
pub const TRASHINFO_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Returns a user-safe, trimmed path string that can be used in logs and messages.
pub fn sanitize_user_path(path: &Path) -> String {
    path.display().to_string().trim().to_string()
}

/// Parses an ISO-like deletion date string into a UTC datetime.
pub fn parse_trash_datetime(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TRASHINFO_TIME_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.with_timezone(&Utc)))
}

/// Serializes a timestamp into the trash info deletion date format.
pub fn serialize_system_time(time: SystemTime) -> String {
    let dt = DateTime::<Utc>::from(time);
    dt.format(TRASHINFO_TIME_FORMAT).to_string()
}

/// Human readable size rendering.
pub fn print_size(bytes: u64) -> String {
    const SUFFIXES: [&str; 5] = ["B", "K", "M", "G", "T"];
    let mut value = bytes as f64;
    let mut idx = 0usize;

    while value >= 1024.0 && idx < SUFFIXES.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }

    if idx == 0 {
        format!("{:.0} {}", value, SUFFIXES[idx])
    } else {
        format!("{:.1} {}", value, SUFFIXES[idx])
    }
}

/// Makes `path` absolute against the current directory and folds `.`/`..`
/// lexically. Symlinks are left alone so a trashed link stays a link.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = env::current_dir().map_err(|err| CoreError::PathResolution(path.to_path_buf(), err))?;
        cwd.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Writes `data` to a temp file next to `path`, then renames it into place.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir).map_err(|err| CoreError::io(dir, err))?;
    temp.write_all(data).map_err(|err| CoreError::io(temp.path(), err))?;
    temp.persist(path).map_err(|err| CoreError::io(path, err.error))?;
    Ok(())
}

/// Seconds since the epoch, negative for pre-1970 timestamps.
pub fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    }
}

/// Nanoseconds since the epoch, clamped to zero for pre-1970 timestamps.
pub fn unix_nanos(time: SystemTime) -> u128 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or(0)
}
