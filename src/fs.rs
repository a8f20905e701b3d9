use crate::errors::{CoreError, Result};
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

/// How a move was carried out.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MoveKind {
    Renamed,
    Copied,
}

/// Filesystem boundary for moving objects in and out of the trash.
///
/// Keeping this trait narrow makes it easy to fake awkward conditions in
/// tests, such as a rename that always crosses a device boundary.
pub trait FileSystem: Send + Sync {
    /// Reads metadata without following a final symlink.
    fn symlink_metadata(&self, path: &Path) -> Result<Metadata>;

    /// Creates a directory and all missing parent directories.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Renames/moves a path within one filesystem.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Copies a file, symlink or whole directory tree.
    fn copy_tree(&self, from: &Path, to: &Path) -> Result<()>;

    /// Removes a file, symlink or whole directory tree.
    fn remove_tree(&self, path: &Path) -> Result<()>;

    /// Moves `from` to `to`, degrading to copy-then-delete across devices.
    ///
    /// If the copy succeeds but removing the source fails, the copy is left
    /// in place and `CoreError::SourceNotRemoved` is returned.
    fn move_path(&self, from: &Path, to: &Path) -> Result<MoveKind> {
        match self.rename(from, to) {
            Ok(()) => Ok(MoveKind::Renamed),
            Err(err) if err.io_error().is_some_and(is_cross_device) => {
                self.copy_tree(from, to)?;
                if let Err(err) = self.remove_tree(from) {
                    warn!(
                        source = %from.display(),
                        copy = %to.display(),
                        error = %err,
                        "copied across devices but could not remove the source"
                    );
                    return Err(CoreError::SourceNotRemoved(to.to_path_buf(), Box::new(err)));
                }
                Ok(MoveKind::Copied)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(unix)]
pub fn is_cross_device(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EXDEV)
}

#[cfg(not(unix))]
pub fn is_cross_device(_err: &io::Error) -> bool {
    false
}

/// Default filesystem implementation backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn symlink_metadata(&self, path: &Path) -> Result<Metadata> {
        fs::symlink_metadata(path).map_err(|err| CoreError::io(path, err))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|err| CoreError::io(path, err))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).map_err(|err| CoreError::io(from, err))
    }

    fn copy_tree(&self, from: &Path, to: &Path) -> Result<()> {
        for entry in WalkDir::new(from).follow_links(false) {
            let entry = entry.map_err(|err| {
                let path = err.path().unwrap_or(from).to_path_buf();
                CoreError::io(path, io::Error::from(err))
            })?;
            let target = match entry.path().strip_prefix(from) {
                Ok(relative) if !relative.as_os_str().is_empty() => to.join(relative),
                _ => to.to_path_buf(),
            };
            let file_type = entry.file_type();

            if file_type.is_dir() {
                fs::create_dir_all(&target).map_err(|err| CoreError::io(&target, err))?;
            } else if file_type.is_symlink() {
                copy_symlink(entry.path(), &target)?;
            } else {
                fs::copy(entry.path(), &target).map_err(|err| CoreError::io(entry.path(), err))?;
            }
        }
        Ok(())
    }

    fn remove_tree(&self, path: &Path) -> Result<()> {
        let meta = self.symlink_metadata(path)?;
        let result = if meta.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        result.map_err(|err| CoreError::io(path, err))
    }
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    let target = fs::read_link(from).map_err(|err| CoreError::io(from, err))?;
    std::os::unix::fs::symlink(target, to).map_err(|err| CoreError::io(to, err))
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to).map(|_| ()).map_err(|err| CoreError::io(from, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    /// Pretends every rename crosses a device boundary.
    struct CrossDevice {
        fail_remove: AtomicBool,
    }

    impl FileSystem for CrossDevice {
        fn symlink_metadata(&self, path: &Path) -> Result<Metadata> {
            RealFileSystem.symlink_metadata(path)
        }

        fn create_dir_all(&self, path: &Path) -> Result<()> {
            RealFileSystem.create_dir_all(path)
        }

        fn rename(&self, from: &Path, _to: &Path) -> Result<()> {
            Err(CoreError::io(from, io::Error::from_raw_os_error(libc::EXDEV)))
        }

        fn copy_tree(&self, from: &Path, to: &Path) -> Result<()> {
            RealFileSystem.copy_tree(from, to)
        }

        fn remove_tree(&self, path: &Path) -> Result<()> {
            if self.fail_remove.load(Ordering::SeqCst) {
                return Err(CoreError::io(path, io::Error::from(io::ErrorKind::PermissionDenied)));
            }
            RealFileSystem.remove_tree(path)
        }
    }

    fn sample_tree(root: &Path) -> std::path::PathBuf {
        let src = root.join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.txt"), b"alpha").unwrap();
        fs::write(src.join("nested/b.txt"), b"beta").unwrap();
        src
    }

    #[test]
    fn rename_is_preferred() {
        let dir = TempDir::new().unwrap();
        let src = sample_tree(dir.path());
        let dst = dir.path().join("dst");

        assert_eq!(RealFileSystem.move_path(&src, &dst).unwrap(), MoveKind::Renamed);
        assert!(!src.exists());
        assert_eq!(fs::read(dst.join("nested/b.txt")).unwrap(), b"beta");
    }

    #[test]
    fn cross_device_moves_copy_then_delete() {
        let dir = TempDir::new().unwrap();
        let src = sample_tree(dir.path());
        let dst = dir.path().join("dst");
        let fs_double = CrossDevice {
            fail_remove: AtomicBool::new(false),
        };

        assert_eq!(fs_double.move_path(&src, &dst).unwrap(), MoveKind::Copied);
        assert!(!src.exists());
        assert_eq!(fs::read(dst.join("a.txt")).unwrap(), b"alpha");
        assert_eq!(fs::read(dst.join("nested/b.txt")).unwrap(), b"beta");
    }

    #[test]
    fn failed_source_removal_leaves_both_copies() {
        let dir = TempDir::new().unwrap();
        let src = sample_tree(dir.path());
        let dst = dir.path().join("dst");
        let fs_double = CrossDevice {
            fail_remove: AtomicBool::new(true),
        };

        let err = fs_double.move_path(&src, &dst).unwrap_err();
        assert!(matches!(&err, CoreError::SourceNotRemoved(copy, _) if *copy == dst));
        assert!(src.join("a.txt").exists());
        assert!(dst.join("a.txt").exists());
    }

    #[test]
    fn single_files_move_across_devices() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("one.txt");
        fs::write(&src, b"1").unwrap();
        let dst = dir.path().join("two.txt");
        let fs_double = CrossDevice {
            fail_remove: AtomicBool::new(false),
        };

        fs_double.move_path(&src, &dst).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"1");
        assert!(!src.exists());
    }

    #[test]
    fn other_rename_errors_propagate() {
        let dir = TempDir::new().unwrap();
        let err = RealFileSystem
            .move_path(&dir.path().join("missing"), &dir.path().join("dst"))
            .unwrap_err();
        assert!(matches!(err, CoreError::Io(..)));
    }
}
