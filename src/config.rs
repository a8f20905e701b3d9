//! Process-wide locations, read once from the environment.

use crate::errors::{CoreError, Result};
use crate::models::TrashDirectory;
use std::collections::HashMap;
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Registry file name inside the data-home trash.
pub const REGISTRY_FILE: &str = "trash.registry.json";

/// Directory name of the home trash under the data home.
pub const HOME_TRASH_DIR: &str = "Trash";

pub const HOME_ENV: &str = "HOME";
pub const DATA_HOME_ENV: &str = "XDG_DATA_HOME";
pub const MOUNT_PREFIXES_ENV: &str = "TRXSH_MOUNT_PREFIXES";

#[cfg(target_os = "macos")]
const DEFAULT_MOUNT_PREFIXES: &[&str] = &["/Volumes"];
#[cfg(not(target_os = "macos"))]
const DEFAULT_MOUNT_PREFIXES: &[&str] = &["/mnt", "/media", "/run/media"];

type EnvVarMap = HashMap<String, OsString>;

#[derive(Debug, Clone)]
pub struct Config {
    pub home: PathBuf,
    pub data_home: PathBuf,
    /// Paths under these prefixes are looked up in the mount table.
    pub mount_prefixes: Vec<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let vars = [HOME_ENV, DATA_HOME_ENV, MOUNT_PREFIXES_ENV]
            .into_iter()
            .filter_map(|key| env::var_os(key).map(|value| (key.to_string(), value)))
            .collect::<EnvVarMap>();
        Self::from_vars(&vars)
    }

    pub fn from_vars(vars: &EnvVarMap) -> Result<Self> {
        let home = vars
            .get(HOME_ENV)
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| CoreError::missing("$HOME is not set"))?;

        let data_home = match vars.get(DATA_HOME_ENV).filter(|v| !v.is_empty()) {
            Some(value) => expand_user_path(&home, value),
            None => default_data_home(&home),
        };

        let mount_prefixes = match vars.get(MOUNT_PREFIXES_ENV) {
            Some(value) => env::split_paths(value)
                .filter(|prefix| !prefix.as_os_str().is_empty())
                .collect(),
            None => DEFAULT_MOUNT_PREFIXES.iter().map(PathBuf::from).collect(),
        };

        Ok(Self {
            home,
            data_home,
            mount_prefixes,
        })
    }

    /// Configuration rooted at explicit directories, with no mount prefixes.
    pub fn with_roots(home: impl Into<PathBuf>, data_home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            data_home: data_home.into(),
            mount_prefixes: Vec::new(),
        }
    }

    pub fn with_mount_prefixes(mut self, prefixes: Vec<PathBuf>) -> Self {
        self.mount_prefixes = prefixes;
        self
    }

    pub fn home_trash(&self) -> TrashDirectory {
        TrashDirectory::new(self.data_home.join(HOME_TRASH_DIR))
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_home.join(HOME_TRASH_DIR).join(REGISTRY_FILE)
    }
}

fn expand_user_path(home: &Path, value: &OsStr) -> PathBuf {
    let path = Path::new(value);
    if let Ok(rest) = path.strip_prefix("~") {
        if rest.as_os_str().is_empty() {
            return home.to_path_buf();
        }
        return home.join(rest);
    }
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(path)
    }
}

#[cfg(target_os = "macos")]
fn default_data_home(home: &Path) -> PathBuf {
    home.join("Library").join("Application Support")
}

#[cfg(not(target_os = "macos"))]
fn default_data_home(home: &Path) -> PathBuf {
    home.join(".local").join("share")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> EnvVarMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect()
    }

    #[test]
    fn home_is_required() {
        let err = Config::from_vars(&vars(&[])).unwrap_err();
        assert!(matches!(err, CoreError::MissingValue(_)));
    }

    #[test]
    fn data_home_override_wins() {
        let config = Config::from_vars(&vars(&[("HOME", "/home/u"), (DATA_HOME_ENV, "/srv/data")])).unwrap();
        assert_eq!(config.data_home, PathBuf::from("/srv/data"));
        assert_eq!(config.registry_path(), PathBuf::from("/srv/data/Trash/trash.registry.json"));
        assert_eq!(config.home_trash().files_dir, PathBuf::from("/srv/data/Trash/files"));
    }

    #[test]
    fn tilde_and_relative_overrides_expand_against_home() {
        let config = Config::from_vars(&vars(&[("HOME", "/home/u"), (DATA_HOME_ENV, "~/data")])).unwrap();
        assert_eq!(config.data_home, PathBuf::from("/home/u/data"));

        let config = Config::from_vars(&vars(&[("HOME", "/home/u"), (DATA_HOME_ENV, "share")])).unwrap();
        assert_eq!(config.data_home, PathBuf::from("/home/u/share"));
    }

    #[test]
    fn mount_prefixes_can_be_overridden() {
        let config = Config::from_vars(&vars(&[("HOME", "/home/u"), (MOUNT_PREFIXES_ENV, "/a::/b")])).unwrap();
        assert_eq!(config.mount_prefixes, vec![PathBuf::from("/a"), PathBuf::from("/b")]);

        let config = Config::from_vars(&vars(&[("HOME", "/home/u")])).unwrap();
        assert!(!config.mount_prefixes.is_empty());
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn default_data_home_is_local_share() {
        let config = Config::from_vars(&vars(&[("HOME", "/home/u")])).unwrap();
        assert_eq!(config.data_home, PathBuf::from("/home/u/.local/share"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_home_is_kept_verbatim() {
        use std::os::unix::ffi::OsStringExt;

        let home = OsString::from_vec(b"/home/\xffu".to_vec());
        let mut env = vars(&[(DATA_HOME_ENV, "~")]);
        env.insert(HOME_ENV.to_string(), home.clone());
        let config = Config::from_vars(&env).unwrap();
        assert_eq!(config.home.as_os_str(), home.as_os_str());
        assert_eq!(config.data_home, config.home);
    }
}
