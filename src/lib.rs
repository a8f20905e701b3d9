//! Core of `trxsh`: a trash registry with collision-safe names, per-volume
//! trash roots and a cache of trashed directory sizes.
//!
//! Every command reloads the registry and the size caches from disk and
//! writes them back before it exits. There is no locking: two `trxsh`
//! processes working on the same trash race on those files and the last
//! writer wins.

pub mod codec;
pub mod config;
pub mod dirsize;
pub mod errors;
pub mod fs;
pub mod helpers;
pub mod locator;
pub mod models;
pub mod registry;
pub mod trash;
pub mod trashinfo;

pub use codec::{decode, encode, Token};
pub use config::Config;
pub use dirsize::{DirSizeCache, DirSizeCacheEntry, DirSizer, RefreshReport, WalkDirSizer};
pub use errors::{CoreError, Result};
pub use fs::{FileSystem, MoveKind, RealFileSystem};
pub use helpers::{
    parse_trash_datetime,
    print_size,
    sanitize_user_path,
    serialize_system_time,
    TRASHINFO_EXTENSION,
    TRASHINFO_TIME_FORMAT,
};
pub use locator::{DfVolumeResolver, TrashLocator, VolumeResolver};
pub use models::{
    BatchReport,
    CommandKind,
    ExitStatusLike,
    ItemOutcome,
    SkipReason,
    TrashDirectory,
};
pub use registry::{Record, Registry};
pub use trash::{SizeReport, TrashCan};
pub use trashinfo::TrashInfo;

/// Re-export a small stable API surface for command crates.
pub mod prelude {
    pub use crate::{
        errors::{CoreError, Result},
        models::*,
        registry::Record,
        trash::{SizeReport, TrashCan},
        Config,
    };
}
