//! The operations the command line and the picker call.

use crate::codec;
use crate::config::Config;
use crate::dirsize::{DirSizeCache, DirSizeCacheEntry, DirSizer, WalkDirSizer};
use crate::errors::{CoreError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::helpers::absolutize;
use crate::locator::{DfVolumeResolver, TrashLocator, VolumeResolver};
use crate::models::{BatchReport, ItemOutcome, SkipReason, TrashDirectory};
use crate::registry::{Record, Registry};
use crate::trashinfo::{self, TrashInfo};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Sizes of trashed directories across every known trash root.
#[derive(Debug, Default, Clone)]
pub struct SizeReport {
    pub entries: Vec<DirSizeCacheEntry>,
    /// Bytes held by every scanned root, plain files included.
    pub total_bytes: u64,
    /// Directory trees walked to produce this report.
    pub walks: usize,
}

impl SizeReport {
    /// `(folder name, bytes)` pairs in cache order.
    pub fn sizes(&self) -> Vec<(String, u64)> {
        self.entries
            .iter()
            .map(|entry| (entry.folder_name.clone(), entry.size))
            .collect()
    }
}

pub struct TrashCan {
    config: Config,
    registry: Registry,
    locator: TrashLocator,
    fs: Arc<dyn FileSystem>,
    sizer: Arc<dyn DirSizer>,
}

impl TrashCan {
    /// Loads the registry named by `config`, wired to the real system.
    pub fn open(config: Config) -> Result<Self> {
        let registry = Registry::load(config.registry_path())?;
        Ok(Self {
            locator: TrashLocator::new(config.clone(), Arc::new(DfVolumeResolver)),
            registry,
            config,
            fs: Arc::new(RealFileSystem),
            sizer: Arc::new(WalkDirSizer),
        })
    }

    pub fn with_volume_resolver(mut self, resolver: Arc<dyn VolumeResolver>) -> Self {
        self.locator = TrashLocator::new(self.config.clone(), resolver);
        self
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_dir_sizer(mut self, sizer: Arc<dyn DirSizer>) -> Self {
        self.sizer = sizer;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn list(&self) -> &[Record] {
        self.registry.list()
    }

    pub fn size_cache(&self, trash: &TrashDirectory) -> DirSizeCache {
        DirSizeCache::new(trash.clone(), self.sizer.clone())
    }

    /// Moves every path into its trash root.
    ///
    /// Each path gets its own outcome and a failure never stops the batch.
    /// The only error is a registry that cannot be saved afterwards.
    pub fn trash<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<BatchReport> {
        if paths.is_empty() {
            return Err(CoreError::invalid_input("no files specified"));
        }

        let mut report = BatchReport::default();
        let mut touched: Vec<TrashDirectory> = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let outcome = self.trash_one(path, &mut touched).unwrap_or_else(|error| {
                warn!(path = %path.display(), error = %error, "could not trash");
                ItemOutcome::Failed {
                    target: path.display().to_string(),
                    error,
                }
            });
            report.push(outcome);
        }

        for trash in &touched {
            self.size_cache(trash).refresh();
        }
        if report.success_count() > 0 {
            self.registry.save()?;
        }
        Ok(report)
    }

    fn trash_one(&mut self, path: &Path, touched: &mut Vec<TrashDirectory>) -> Result<ItemOutcome> {
        let absolute = absolutize(path)?;
        match self.fs.symlink_metadata(&absolute) {
            Ok(_) => {}
            Err(err) if is_not_found(&err) => {
                return Ok(ItemOutcome::Skipped {
                    path: absolute.clone(),
                    reason: SkipReason::MissingPath(absolute),
                });
            }
            Err(CoreError::Io(path, err)) => return Err(CoreError::PathResolution(path, err)),
            Err(err) => return Err(err),
        }

        let trash = self.locator.root_for(&absolute)?;
        let home = self.locator.home_trash();
        if trash.contains(&absolute) || home.contains(&absolute) {
            return Ok(ItemOutcome::Skipped {
                path: absolute.clone(),
                reason: SkipReason::AlreadyTrashed(absolute),
            });
        }
        if trash.path.starts_with(&absolute) || home.path.starts_with(&absolute) {
            return Err(CoreError::conflict(format!(
                "{} contains the trash itself",
                absolute.display()
            )));
        }

        self.fs.create_dir_all(&trash.files_dir)?;
        let token = codec::encode(&absolute)?.disambiguate(|name| {
            trash.trashed_path(name).symlink_metadata().is_ok()
                || trashinfo::info_path(&trash.info_dir, name).exists()
        });
        let record = self
            .registry
            .add(token.base_name(), token.to_string(), absolute.clone());

        let trashed_path = match self.stash(&absolute, &trash, &record) {
            Ok(trashed_path) => trashed_path,
            Err(err) => {
                // Nothing moved, so the record must not outlive this call.
                let _ = self.registry.remove(record.id);
                return Err(err);
            }
        };

        info!(id = record.id, source = %absolute.display(), "trashed");
        if !touched.contains(&trash) {
            touched.push(trash);
        }
        Ok(ItemOutcome::Trashed {
            id: record.id,
            source: absolute,
            trashed_path,
        })
    }

    /// Writes metadata, then moves the object. Undoes the metadata when the
    /// move fails.
    fn stash(&self, source: &Path, trash: &TrashDirectory, record: &Record) -> Result<PathBuf> {
        let info = TrashInfo::new(record.path.clone(), SystemTime::now());
        trashinfo::write_info(&trash.info_dir, &record.encoded_name, &info)?;

        let target = trash.trashed_path(&record.encoded_name);
        if let Err(err) = self.relocate(source, &target) {
            if let Err(undo) = trashinfo::remove_info(&trash.info_dir, &record.encoded_name) {
                warn!(error = %undo, "could not remove trash info after a failed move");
            }
            return Err(err);
        }
        Ok(target)
    }

    /// Moves `from` to `to`, which must not exist yet.
    ///
    /// A complete copy whose source could not be removed counts as moved:
    /// the leftovers of `from` stay where they are. Any other failure
    /// removes whatever part of `to` was copied.
    fn relocate(&self, from: &Path, to: &Path) -> Result<()> {
        match self.fs.move_path(from, to) {
            Ok(_) => Ok(()),
            Err(CoreError::SourceNotRemoved(copy, err)) => {
                warn!(
                    source = %from.display(),
                    copy = %copy.display(),
                    error = %err,
                    "moved by copy, source left behind"
                );
                Ok(())
            }
            Err(err) => {
                if self.fs.symlink_metadata(from).is_ok() && self.fs.symlink_metadata(to).is_ok() {
                    if let Err(undo) = self.fs.remove_tree(to) {
                        warn!(path = %to.display(), error = %undo, "could not remove partial copy");
                    }
                }
                Err(err)
            }
        }
    }

    /// Moves a trashed item back to where it came from.
    ///
    /// On any error the registry file is left untouched.
    pub fn restore(&mut self, id: u64) -> Result<Record> {
        let record = self.registry.get(id)?.clone();
        let (trash, trashed) = self.locate_trashed(&record)?;

        if self.fs.symlink_metadata(&record.path).is_ok() {
            return Err(CoreError::conflict(format!(
                "{} already exists",
                record.path.display()
            )));
        }
        if let Some(parent) = record.path.parent() {
            self.fs.create_dir_all(parent)?;
        }
        self.relocate(&trashed, &record.path)?;

        if let Err(err) = trashinfo::remove_info(&trash.info_dir, &record.encoded_name) {
            warn!(id, error = %err, "could not remove trash info");
        }
        self.registry.remove(id)?;
        self.size_cache(&trash).refresh();
        self.registry.save()?;

        info!(id, path = %record.path.display(), "restored");
        Ok(record)
    }

    /// Restores every id, collecting one outcome per id.
    pub fn restore_many(&mut self, ids: &[u64]) -> BatchReport {
        let mut report = BatchReport::default();
        for &id in ids {
            let outcome = match self.restore(id) {
                Ok(record) => ItemOutcome::Restored { id, path: record.path },
                Err(error) => {
                    warn!(id, error = %error, "could not restore");
                    ItemOutcome::Failed {
                        target: id.to_string(),
                        error,
                    }
                }
            };
            report.push(outcome);
        }
        report
    }

    /// The trash holding `record`: where the locator points today, or the
    /// home trash when the volume moved.
    fn locate_trashed(&self, record: &Record) -> Result<(TrashDirectory, PathBuf)> {
        let located = self.locator.root_for(&record.path)?;
        let home = self.locator.home_trash();
        let mut last_err = None;
        for trash in [located, home] {
            let trashed = trash.trashed_path(&record.encoded_name);
            match self.fs.symlink_metadata(&trashed) {
                Ok(_) => return Ok((trash, trashed)),
                Err(err) => {
                    debug!(path = %trashed.display(), "trashed object not found here");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| CoreError::missing(record.encoded_name.clone())))
    }

    /// Empties every known trash root and persists an empty registry.
    pub fn cleanup(&mut self) -> Result<()> {
        for trash in self.known_roots() {
            self.remove_if_present(&trash.files_dir)?;
            self.remove_if_present(&trash.info_dir)?;
            self.size_cache(&trash).clear()?;
            info!(path = %trash.path.display(), "emptied trash");
        }
        self.registry.clear();
        self.registry.save()
    }

    /// Refreshes every known root's size cache and gathers the results.
    pub fn report_sizes(&self) -> SizeReport {
        let mut report = SizeReport::default();
        for trash in self.known_roots() {
            let refreshed = self.size_cache(&trash).refresh();
            report.total_bytes += refreshed.total_bytes;
            report.walks += refreshed.walks;
            report.entries.extend(refreshed.entries);
        }
        report
    }

    /// The home trash plus the trash of every live record.
    fn known_roots(&self) -> Vec<TrashDirectory> {
        let mut roots = vec![self.locator.home_trash()];
        for record in self.registry.list() {
            match self.locator.root_for(&record.path) {
                Ok(root) if !roots.contains(&root) => roots.push(root),
                Ok(_) => {}
                Err(err) => debug!(id = record.id, error = %err, "cannot locate trash root"),
            }
        }
        roots
    }

    fn remove_if_present(&self, path: &Path) -> Result<()> {
        match self.fs.symlink_metadata(path) {
            Ok(_) => self.fs.remove_tree(path),
            Err(err) if is_not_found(&err) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

fn is_not_found(err: &CoreError) -> bool {
    err.io_error()
        .is_some_and(|err| err.kind() == io::ErrorKind::NotFound)
}
