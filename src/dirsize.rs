//! Cached recursive sizes of the directories sitting in a trash root.
//!
//! Only top-level directories are cached; plain files are cheap to stat.
//! An entry stays valid as long as the mtime of the directory's
//! `.trashinfo` file is the one recorded next to the size. The cache file
//! holds one `<mtime> <size> <encoded name>` line per directory.

use crate::codec::{display_name, SEGMENT_DELIMITER};
use crate::errors::{CoreError, Result};
use crate::helpers::{atomic_write, unix_seconds};
use crate::models::TrashDirectory;
use crate::trashinfo::{info_path, read_info};
use std::collections::HashMap;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Computes the recursive size of a directory tree.
pub trait DirSizer: Send + Sync {
    fn dir_size(&self, path: &Path) -> io::Result<u64>;
}

/// Sums regular-file sizes with `walkdir`, never following symlinks.
#[derive(Debug, Default, Clone, Copy)]
pub struct WalkDirSizer;

impl DirSizer for WalkDirSizer {
    fn dir_size(&self, path: &Path) -> io::Result<u64> {
        let mut total = 0;
        for entry in WalkDir::new(path).follow_links(false) {
            let entry = entry?;
            if entry.file_type().is_file() {
                total += entry.metadata()?.len();
            }
        }
        Ok(total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirSizeCacheEntry {
    pub encoded_name: String,
    pub folder_name: String,
    pub size: u64,
    /// Seconds; mtime of the `.trashinfo` file when `size` was measured.
    pub mtime: i64,
}

impl DirSizeCacheEntry {
    /// `<mtime> <size> <encoded name>`; keyed by encoded name, not folder name.
    fn to_line(&self) -> String {
        format!("{} {} {}\n", self.mtime, self.size, self.encoded_name)
    }

    fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.splitn(3, ' ');
        let mtime = parts.next()?.parse().ok()?;
        let size = parts.next()?.parse().ok()?;
        let encoded_name = parts.next()?.trim_end_matches('\r');
        if encoded_name.is_empty() {
            return None;
        }
        Some(Self {
            folder_name: display_name(encoded_name),
            encoded_name: encoded_name.to_string(),
            size,
            mtime,
        })
    }
}

/// Outcome of one `refresh`.
#[derive(Debug, Default, Clone)]
pub struct RefreshReport {
    /// Bytes of every top-level file plus every sized directory.
    pub total_bytes: u64,
    pub entries: Vec<DirSizeCacheEntry>,
    /// Directory trees walked because the cache missed.
    pub walks: usize,
    pub reused: usize,
    /// Directories skipped for lack of metadata.
    pub orphans: usize,
}

pub struct DirSizeCache {
    trash: TrashDirectory,
    sizer: Arc<dyn DirSizer>,
}

impl DirSizeCache {
    pub fn new(trash: TrashDirectory, sizer: Arc<dyn DirSizer>) -> Self {
        Self { trash, sizer }
    }

    pub fn cache_path(&self) -> &Path {
        &self.trash.size_cache
    }

    /// Cached entries as persisted. Unparsable lines are skipped.
    pub fn list(&self) -> Vec<DirSizeCacheEntry> {
        let contents = match fs::read_to_string(&self.trash.size_cache) {
            Ok(contents) => contents,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    warn!(path = %self.trash.size_cache.display(), error = %err, "cannot read size cache");
                }
                return Vec::new();
            }
        };

        contents
            .lines()
            .filter_map(|line| {
                let entry = DirSizeCacheEntry::parse_line(line);
                if entry.is_none() && !line.trim().is_empty() {
                    debug!(line, "skipping malformed size cache line");
                }
                entry
            })
            .collect()
    }

    /// Re-scans the trash root, reusing sizes whose metadata is unchanged.
    ///
    /// Never fails: unreadable entries are skipped and a failed write only
    /// costs a re-walk next time.
    pub fn refresh(&self) -> RefreshReport {
        let cached: HashMap<String, DirSizeCacheEntry> = self
            .list()
            .into_iter()
            .map(|entry| (entry.encoded_name.clone(), entry))
            .collect();
        let mut report = RefreshReport::default();

        match fs::read_dir(&self.trash.files_dir) {
            Ok(children) => {
                for child in children {
                    let child = match child {
                        Ok(child) => child,
                        Err(err) => {
                            debug!(error = %err, "skipping unreadable trash entry");
                            continue;
                        }
                    };
                    self.scan_child(&child.path(), &cached, &mut report);
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %self.trash.files_dir.display(), error = %err, "cannot list trash root"),
        }

        report.entries.sort_by(|a, b| a.encoded_name.cmp(&b.encoded_name));
        if let Err(err) = self.persist(&report.entries) {
            warn!(error = %err, "cannot write size cache");
        }
        report
    }

    fn scan_child(&self, path: &Path, cached: &HashMap<String, DirSizeCacheEntry>, report: &mut RefreshReport) {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping entry");
                return;
            }
        };
        if !meta.is_dir() {
            report.total_bytes += meta.len();
            return;
        }

        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            debug!(path = %path.display(), "skipping non UTF-8 entry");
            return;
        };
        let Some((info, info_meta)) = self.find_info(name) else {
            debug!(name, "no trash info for directory, leaving it out");
            report.orphans += 1;
            return;
        };
        let Ok(modified) = info_meta.modified() else {
            return;
        };
        let mtime = unix_seconds(modified);

        let entry = match cached.get(name) {
            Some(hit) if hit.mtime == mtime => {
                report.reused += 1;
                DirSizeCacheEntry {
                    folder_name: folder_name(&info, name),
                    ..hit.clone()
                }
            }
            _ => {
                report.walks += 1;
                match self.sizer.dir_size(path) {
                    Ok(size) => {
                        debug!(name, size, "measured trashed directory");
                        DirSizeCacheEntry {
                            encoded_name: name.to_string(),
                            folder_name: folder_name(&info, name),
                            size,
                            mtime,
                        }
                    }
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "cannot measure directory");
                        return;
                    }
                }
            }
        };

        report.total_bytes += entry.size;
        report.entries.push(entry);
    }

    /// Metadata for `name`, falling back to the part before the first
    /// delimiter for entries written by older versions.
    fn find_info(&self, name: &str) -> Option<(PathBuf, Metadata)> {
        let legacy = name.split(SEGMENT_DELIMITER).next().unwrap_or(name);
        let mut candidates = vec![info_path(&self.trash.info_dir, name)];
        if legacy != name {
            candidates.push(info_path(&self.trash.info_dir, legacy));
        }

        candidates.into_iter().find_map(|candidate| match fs::metadata(&candidate) {
            Ok(meta) if meta.is_file() => Some((candidate, meta)),
            _ => None,
        })
    }

    fn persist(&self, entries: &[DirSizeCacheEntry]) -> Result<()> {
        if entries.is_empty() {
            return self.clear();
        }
        let contents: String = entries.iter().map(DirSizeCacheEntry::to_line).collect();
        if let Some(parent) = self.trash.size_cache.parent() {
            fs::create_dir_all(parent).map_err(|err| CoreError::io(parent, err))?;
        }
        atomic_write(&self.trash.size_cache, contents.as_bytes())
    }

    /// Deletes the cache file if present.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.trash.size_cache) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CoreError::io(&self.trash.size_cache, err)),
        }
    }
}

fn folder_name(info: &Path, encoded_name: &str) -> String {
    read_info(info)
        .ok()
        .and_then(|info| info.original_name())
        .unwrap_or_else(|| display_name(encoded_name))
}
