use crate::errors::CoreError;
use std::path::{Path, PathBuf};

/// Name of the per-root size cache file.
pub const SIZE_CACHE_FILE: &str = "directorysizes";

/// Command family exposed by the `trxsh` binary.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum CommandKind {
    Trash,
    List,
    Restore,
    Pick,
    Cleanup,
    Sizes,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trash => "trash",
            Self::List => "list",
            Self::Restore => "restore",
            Self::Pick => "fzf",
            Self::Cleanup => "cleanup",
            Self::Sizes => "dir-sizes",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One trash root and the locations derived from it.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct TrashDirectory {
    pub path: PathBuf,
    pub files_dir: PathBuf,
    pub info_dir: PathBuf,
    pub size_cache: PathBuf,
    pub mount_point: Option<PathBuf>,
}

impl TrashDirectory {
    pub fn new(path: PathBuf) -> Self {
        Self {
            files_dir: path.join("files"),
            info_dir: path.join("info"),
            size_cache: path.join(SIZE_CACHE_FILE),
            path,
            mount_point: None,
        }
    }

    pub fn with_mount_point(mut self, mount_point: PathBuf) -> Self {
        self.mount_point = Some(mount_point);
        self
    }

    /// Physical location of a trashed object.
    pub fn trashed_path(&self, encoded_name: &str) -> PathBuf {
        self.files_dir.join(encoded_name)
    }

    /// True when `path` is the trash root itself or lives inside it.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.path)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SkipReason {
    MissingPath(PathBuf),
    AlreadyTrashed(PathBuf),
}

/// Result of one item inside a trash or restore batch.
#[derive(Debug)]
pub enum ItemOutcome {
    Trashed {
        id: u64,
        source: PathBuf,
        trashed_path: PathBuf,
    },
    Restored {
        id: u64,
        path: PathBuf,
    },
    Skipped {
        path: PathBuf,
        reason: SkipReason,
    },
    Failed {
        target: String,
        error: CoreError,
    },
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Trashed { .. } | Self::Restored { .. })
    }
}

/// Per-item outcomes of a batch, in request order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn push(&mut self, outcome: ItemOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn exit_status(&self) -> ExitStatusLike {
        if self.all_succeeded() {
            ExitStatusLike::Ok
        } else if self.success_count() > 0 {
            ExitStatusLike::Warning
        } else {
            ExitStatusLike::Error
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ExitStatusLike {
    Ok,
    Warning,
    Error,
}

impl ExitStatusLike {
    pub fn as_code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Warning => 2,
            Self::Error => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trash_directory_derives_children() {
        let dir = TrashDirectory::new(PathBuf::from("/data/Trash"));
        assert_eq!(dir.files_dir, PathBuf::from("/data/Trash/files"));
        assert_eq!(dir.info_dir, PathBuf::from("/data/Trash/info"));
        assert_eq!(dir.size_cache, PathBuf::from("/data/Trash/directorysizes"));
        assert!(dir.contains(Path::new("/data/Trash/files/a")));
        assert!(!dir.contains(Path::new("/data/Trashcan")));
    }

    #[test]
    fn batch_exit_status_reflects_mix() {
        let mut report = BatchReport::default();
        assert_eq!(report.exit_status(), ExitStatusLike::Ok);

        report.push(ItemOutcome::Skipped {
            path: PathBuf::from("/missing"),
            reason: SkipReason::MissingPath(PathBuf::from("/missing")),
        });
        assert_eq!(report.exit_status(), ExitStatusLike::Error);

        report.push(ItemOutcome::Restored {
            id: 1,
            path: PathBuf::from("/a"),
        });
        assert_eq!(report.exit_status(), ExitStatusLike::Warning);
        assert_eq!(report.exit_status().as_code(), 2);
    }
}
