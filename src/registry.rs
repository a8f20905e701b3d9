//! Durable list of trashed items.
//!
//! The registry is a flat JSON array kept in insertion order. Lookups scan it
//! linearly; a user's trash stays small enough for that to be fine, and the
//! file stays easy to read and fix by hand.
//!
//! A sibling `.next` file records the next id to hand out, so an id freed by
//! a restore is not handed out again by a later invocation.

use crate::errors::{CoreError, Result};
use crate::helpers::atomic_write;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One trashed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: u64,
    pub name: String,
    pub path: PathBuf,
    pub encoded_name: String,
    pub deleted_at: NaiveDate,
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} -> {}", self.id, self.name, self.path.display())
    }
}

#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    records: Vec<Record>,
    next_id: u64,
}

impl Registry {
    /// Empty, unsaved registry backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
            next_id: 1,
        }
    }

    /// Loads the registry at `path`. A missing file is an empty registry.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let mut registry = Self::new(path);
        let contents = match fs::read_to_string(&registry.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(registry),
            Err(err) => return Err(CoreError::io(&registry.path, err)),
        };

        if !contents.trim().is_empty() {
            registry.records = serde_json::from_str(&contents)
                .map_err(|err| CoreError::RegistryCorrupt(registry.path.clone(), err))?;
        }

        let after_max = registry.records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        registry.next_id = after_max.max(registry.read_sequence().unwrap_or(1));
        debug!(path = %registry.path.display(), records = registry.records.len(), "registry loaded");
        Ok(registry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Id the next `add` will assign.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Appends a record dated today. Call `save` to persist it.
    pub fn add(&mut self, name: impl Into<String>, encoded_name: impl Into<String>, path: impl Into<PathBuf>) -> Record {
        let record = Record {
            id: self.next_id,
            name: name.into(),
            path: path.into(),
            encoded_name: encoded_name.into(),
            deleted_at: Local::now().date_naive(),
        };
        self.next_id += 1;
        self.records.push(record.clone());
        record
    }

    pub fn remove(&mut self, id: u64) -> Result<Record> {
        let index = self
            .records
            .iter()
            .position(|record| record.id == id)
            .ok_or(CoreError::RecordNotFound(id))?;
        Ok(self.records.remove(index))
    }

    pub fn get(&self, id: u64) -> Result<&Record> {
        self.records
            .iter()
            .find(|record| record.id == id)
            .ok_or(CoreError::RecordNotFound(id))
    }

    /// Records in id order.
    pub fn list(&self) -> &[Record] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops every record. Ids keep counting up from where they were.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Writes the full record list, replacing the old file in one rename.
    pub fn save(&self) -> Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| CoreError::InvalidPath(format!("{} has no parent", self.path.display())))?;
        fs::create_dir_all(dir).map_err(|err| CoreError::io(dir, err))?;

        let mut json = serde_json::to_vec_pretty(&self.records).map_err(|err| {
            CoreError::io(&self.path, std::io::Error::new(std::io::ErrorKind::InvalidData, err))
        })?;
        json.push(b'\n');
        atomic_write(&self.path, &json)?;

        if let Err(err) = atomic_write(&self.sequence_path(), format!("{}\n", self.next_id).as_bytes()) {
            warn!(error = %err, "could not persist registry id sequence");
        }
        Ok(())
    }

    fn sequence_path(&self) -> PathBuf {
        self.path.with_extension("next")
    }

    fn read_sequence(&self) -> Option<u64> {
        let text = fs::read_to_string(self.sequence_path()).ok()?;
        text.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry_in(dir: &TempDir) -> Registry {
        Registry::load(dir.path().join("Trash").join("trash.registry.json")).unwrap()
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);
        assert!(registry.is_empty());
        assert_eq!(registry.next_id(), 1);
    }

    #[test]
    fn ids_are_sequential_and_never_reused() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);
        let ids: Vec<u64> = (0..4).map(|i| registry.add(format!("f{i}"), format!("e{i}"), format!("/t/f{i}")).id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);

        registry.remove(4).unwrap();
        registry.remove(2).unwrap();
        assert_eq!(registry.add("g", "eg", "/t/g").id, 5);
        let listed: Vec<u64> = registry.list().iter().map(|r| r.id).collect();
        assert_eq!(listed, vec![1, 3, 5]);
    }

    #[test]
    fn removed_tail_id_is_not_reused_after_reload() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);
        registry.add("a", "ea", "/t/a");
        registry.add("b", "eb", "/t/b");
        registry.remove(2).unwrap();
        registry.save().unwrap();

        let mut reloaded = registry_in(&dir);
        assert_eq!(reloaded.add("c", "ec", "/t/c").id, 3);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);
        let record = registry.add("report.txt", "report.txt__x__1#0", "/home/u/report.txt");
        registry.save().unwrap();

        let reloaded = registry_in(&dir);
        assert_eq!(reloaded.list(), &[record.clone()]);
        assert_eq!(reloaded.get(record.id).unwrap(), &record);
    }

    #[test]
    fn json_uses_documented_keys() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);
        registry.add("a", "a__Lw__1#0", "/a");
        registry.save().unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(registry.path()).unwrap()).unwrap();
        let entry = &value.as_array().unwrap()[0];
        for key in ["id", "name", "path", "encodedName", "deletedAt"] {
            assert!(entry.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn missing_ids_are_reported() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);
        assert!(matches!(registry.get(9), Err(CoreError::RecordNotFound(9))));
        assert!(matches!(registry.remove(9), Err(CoreError::RecordNotFound(9))));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trash.registry.json");
        fs::write(&path, "[{\"id\": ").unwrap();
        assert!(matches!(Registry::load(&path), Err(CoreError::RegistryCorrupt(..))));
    }

    #[test]
    fn blank_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trash.registry.json");
        fs::write(&path, "\n").unwrap();
        assert!(Registry::load(&path).unwrap().is_empty());
    }

    #[test]
    fn clear_keeps_counting() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);
        registry.add("a", "ea", "/a");
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.add("b", "eb", "/b").id, 2);
    }
}
