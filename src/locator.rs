//! Chooses which trash root holds a given path.

use crate::config::Config;
use crate::errors::{CoreError, Result};
use crate::helpers::absolutize;
use crate::models::TrashDirectory;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, warn};

/// Answers "which mount point holds this path".
pub trait VolumeResolver: Send + Sync {
    fn mount_point(&self, path: &Path) -> Result<PathBuf>;
}

/// Resolves mount points through `df -P`, available on Linux and macOS alike.
#[derive(Debug, Default, Clone, Copy)]
pub struct DfVolumeResolver;

impl VolumeResolver for DfVolumeResolver {
    fn mount_point(&self, path: &Path) -> Result<PathBuf> {
        let output = Command::new("df")
            .arg("-P")
            .arg(path)
            .output()
            .map_err(|err| CoreError::VolumeLookup(format!("cannot run df: {err}")))?;
        if !output.status.success() {
            return Err(CoreError::VolumeLookup(format!(
                "df exited with {} for {}",
                output.status,
                path.display()
            )));
        }
        parse_df_mount_point(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| CoreError::VolumeLookup(format!("no mount point reported for {}", path.display())))
    }
}

/// Extracts the "Mounted on" column of POSIX `df -P` output.
pub fn parse_df_mount_point(output: &str) -> Option<PathBuf> {
    let line = output.lines().skip(1).find(|line| !line.trim().is_empty())?;
    // Filesystem, blocks, used, available, capacity, mount point. Device and
    // mount point may both hold spaces, so the mount point is everything after
    // the single space that follows the `NN%` capacity column.
    let start = line.match_indices("% ").find_map(|(at, _)| {
        let capacity = line[..at].rsplit(' ').next()?;
        (!capacity.is_empty() && capacity.bytes().all(|b| b.is_ascii_digit())).then_some(at + 2)
    })?;
    let mount_point = line[start..].trim_end_matches('\r');
    (!mount_point.is_empty()).then(|| PathBuf::from(mount_point))
}

#[derive(Clone)]
pub struct TrashLocator {
    config: Config,
    resolver: Arc<dyn VolumeResolver>,
}

impl TrashLocator {
    pub fn new(config: Config, resolver: Arc<dyn VolumeResolver>) -> Self {
        Self { config, resolver }
    }

    pub fn home_trash(&self) -> TrashDirectory {
        self.config.home_trash()
    }

    /// Trash root for `path`. Volume lookups never fail the caller: any
    /// problem falls back to the data-home trash.
    pub fn root_for(&self, path: &Path) -> Result<TrashDirectory> {
        let absolute = absolutize(path)?;
        let Some(prefix) = self
            .config
            .mount_prefixes
            .iter()
            .find(|prefix| absolute.starts_with(prefix) && absolute != **prefix)
        else {
            return Ok(self.home_trash());
        };

        let probe = nearest_existing_ancestor(&absolute);
        match self.resolver.mount_point(&probe) {
            Ok(mount_point) if mount_point.starts_with(prefix) && mount_point != *prefix => {
                debug!(path = %absolute.display(), mount = %mount_point.display(), "using volume trash");
                Ok(TrashDirectory::new(mount_point.join(volume_trash_name())).with_mount_point(mount_point))
            }
            Ok(mount_point) => {
                debug!(
                    path = %absolute.display(),
                    mount = %mount_point.display(),
                    "mount point outside volume prefix, using home trash"
                );
                Ok(self.home_trash())
            }
            Err(err) => {
                warn!(path = %absolute.display(), error = %err, "volume lookup failed, using home trash");
                Ok(self.home_trash())
            }
        }
    }
}

fn nearest_existing_ancestor(path: &Path) -> PathBuf {
    path.ancestors()
        .find(|candidate| candidate.symlink_metadata().is_ok())
        .unwrap_or_else(|| Path::new("/"))
        .to_path_buf()
}

#[cfg(unix)]
fn volume_trash_name() -> String {
    let uid = unsafe { libc::geteuid() };
    format!(".Trash-{uid}")
}

#[cfg(not(unix))]
fn volume_trash_name() -> String {
    ".Trash".to_string()
}
