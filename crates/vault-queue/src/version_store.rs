use std::path::{Path, PathBuf};

use tracing::warn;
use vault_core::VersionMap;

use crate::error::Result;

const PRIMARY_NAME: &str = "versions.json";
const BACKUP_NAME: &str = "versions.json.bak";
const TMP_NAME: &str = "versions.json.tmp";

/// Atomic-rewrite JSON persistence for the relative-path to file-hash
/// version map. Load order is primary, then backup, then empty; a parse
/// error on the primary silently falls back to the backup.
pub struct VersionStore {
    dir: PathBuf,
}

impl VersionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load(&self) -> Result<VersionMap> {
        match self.try_load(&self.dir.join(PRIMARY_NAME)) {
            Ok(Some(map)) => return Ok(map),
            Ok(None) => return Ok(VersionMap::default()),
            Err(e) => {
                warn!(error = %e, "primary version map unreadable, falling back to backup");
            }
        }

        match self.try_load(&self.dir.join(BACKUP_NAME))? {
            Some(map) => Ok(map),
            None => Ok(VersionMap::default()),
        }
    }

    fn try_load(&self, path: &Path) -> Result<Option<VersionMap>> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(path)?;
        let map: VersionMap = serde_json::from_slice(&bytes)?;
        Ok(Some(map))
    }

    /// Write `versions.json.tmp`, rotate the existing primary to
    /// `versions.json.bak`, then rename the tmp file into place.
    pub fn save(&self, map: &VersionMap) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let tmp_path = self.dir.join(TMP_NAME);
        let primary_path = self.dir.join(PRIMARY_NAME);
        let backup_path = self.dir.join(BACKUP_NAME);

        let json = serde_json::to_vec_pretty(map)?;
        std::fs::write(&tmp_path, json)?;

        if primary_path.exists() {
            std::fs::rename(&primary_path, &backup_path)?;
        }
        std::fs::rename(&tmp_path, &primary_path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_on_empty_directory_yields_empty_map() {
        let dir = TempDir::new().unwrap();
        let store = VersionStore::new(dir.path());
        let map = store.load().unwrap();
        assert!(map.0.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = VersionStore::new(dir.path());
        let mut map = VersionMap::default();
        map.set("a.txt", "hash-a");
        store.save(&map).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.get("a.txt"), Some(&"hash-a".to_string()));
    }

    #[test]
    fn second_save_rotates_primary_to_backup() {
        let dir = TempDir::new().unwrap();
        let store = VersionStore::new(dir.path());

        let mut first = VersionMap::default();
        first.set("a.txt", "hash-1");
        store.save(&first).unwrap();

        let mut second = VersionMap::default();
        second.set("a.txt", "hash-2");
        store.save(&second).unwrap();

        assert!(dir.path().join(BACKUP_NAME).exists());
        let backup_bytes = std::fs::read(dir.path().join(BACKUP_NAME)).unwrap();
        let backup: VersionMap = serde_json::from_slice(&backup_bytes).unwrap();
        assert_eq!(backup.get("a.txt"), Some(&"hash-1".to_string()));

        let primary = store.load().unwrap();
        assert_eq!(primary.get("a.txt"), Some(&"hash-2".to_string()));
    }

    #[test]
    fn corrupt_primary_falls_back_to_backup() {
        let dir = TempDir::new().unwrap();
        let store = VersionStore::new(dir.path());

        let mut good = VersionMap::default();
        good.set("a.txt", "hash-good");
        store.save(&good).unwrap();
        store.save(&good).unwrap();

        std::fs::write(dir.path().join(PRIMARY_NAME), b"not json").unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.get("a.txt"), Some(&"hash-good".to_string()));
    }
}
