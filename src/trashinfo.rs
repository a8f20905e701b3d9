//! `.trashinfo` metadata files.

use crate::errors::{CoreError, Result};
use crate::helpers::{parse_trash_datetime, serialize_system_time, TRASHINFO_EXTENSION};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const HEADER: &str = "[Trash Info]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashInfo {
    pub path: PathBuf,
    pub deletion_date: Option<DateTime<Utc>>,
}

impl TrashInfo {
    pub fn new(path: PathBuf, deleted_at: SystemTime) -> Self {
        Self {
            path,
            deletion_date: Some(DateTime::<Utc>::from(deleted_at)),
        }
    }

    pub fn render(&self) -> String {
        let date = self
            .deletion_date
            .map(|date| serialize_system_time(date.into()))
            .unwrap_or_default();
        format!("{HEADER}\nPath={}\nDeletionDate={date}\n", self.path.display())
    }

    /// Parses metadata text. `source` only labels the error.
    pub fn parse(contents: &str, source: &Path) -> Result<Self> {
        let mut path = None;
        let mut deletion_date = None;
        for line in contents.lines() {
            if let Some(value) = line.strip_prefix("Path=") {
                if path.is_none() {
                    path = Some(PathBuf::from(value.trim()));
                }
            } else if let Some(value) = line.strip_prefix("DeletionDate=") {
                if deletion_date.is_none() {
                    deletion_date = parse_trash_datetime(value.trim());
                }
            }
        }

        let path = path
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or_else(|| CoreError::InvalidTrashInfo(source.to_path_buf()))?;
        Ok(Self { path, deletion_date })
    }

    /// Base name of the original item, used for display.
    pub fn original_name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

pub fn info_path(info_dir: &Path, encoded_name: &str) -> PathBuf {
    info_dir.join(format!("{encoded_name}{TRASHINFO_EXTENSION}"))
}

/// Writes the metadata file for `encoded_name`, creating `info_dir` if needed.
pub fn write_info(info_dir: &Path, encoded_name: &str, info: &TrashInfo) -> Result<PathBuf> {
    fs::create_dir_all(info_dir).map_err(|err| CoreError::io(info_dir, err))?;
    let path = info_path(info_dir, encoded_name);
    fs::write(&path, info.render()).map_err(|err| CoreError::io(&path, err))?;
    Ok(path)
}

pub fn read_info(path: &Path) -> Result<TrashInfo> {
    let contents = fs::read_to_string(path).map_err(|err| CoreError::io(path, err))?;
    TrashInfo::parse(&contents, path)
}

pub fn remove_info(info_dir: &Path, encoded_name: &str) -> Result<()> {
    let path = info_path(info_dir, encoded_name);
    fs::remove_file(&path).map_err(|err| CoreError::io(&path, err))
}
