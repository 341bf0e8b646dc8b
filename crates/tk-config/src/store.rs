//! Scalar key-value persistence.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ConfigResult;
use crate::keys::{ConfigKey, Scalar};

/// Persistent storage of individual settings.
///
/// Implementations may block; callers keep them out of the control tick.
pub trait ConfigStore {
    /// Stored value for `key`, `None` when absent.
    fn load_scalar(&self, key: ConfigKey) -> ConfigResult<Option<Scalar>>;

    fn save_scalar(&mut self, key: ConfigKey, value: Scalar) -> ConfigResult<()>;

    /// Store several settings together.
    ///
    /// The default writes them one by one; file-backed stores override it
    /// with a single write.
    fn save_all(&mut self, values: &[(ConfigKey, Scalar)]) -> ConfigResult<()> {
        for &(key, value) in values {
            self.save_scalar(key, value)?;
        }
        Ok(())
    }
}

/// Volatile store, used in tests and when no file is configured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    values: BTreeMap<ConfigKey, Scalar>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigStore for MemoryStore {
    fn load_scalar(&self, key: ConfigKey) -> ConfigResult<Option<Scalar>> {
        Ok(self.values.get(&key).copied())
    }

    fn save_scalar(&mut self, key: ConfigKey, value: Scalar) -> ConfigResult<()> {
        self.values.insert(key, value);
        Ok(())
    }
}

/// Settings kept as one JSON object in a file.
///
/// Every save rewrites the file through a sibling `.tmp` file and a rename,
/// so readers never see a half-written object. A missing file reads as an
/// empty store. Unknown entries already in the file are kept.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> ConfigResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> ConfigResult<BTreeMap<String, Scalar>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }

    fn write_map(&self, map: &BTreeMap<String, Scalar>) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(map)?;
        let temp = self.temp_path();
        fs::write(&temp, content)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

impl ConfigStore for JsonFileStore {
    fn load_scalar(&self, key: ConfigKey) -> ConfigResult<Option<Scalar>> {
        Ok(self.read_map()?.get(key.as_str()).copied())
    }

    fn save_scalar(&mut self, key: ConfigKey, value: Scalar) -> ConfigResult<()> {
        let mut map = self.read_map()?;
        map.insert(key.as_str().to_string(), value);
        self.write_map(&map)?;
        debug!(key = key.as_str(), path = %self.path.display(), "setting saved");
        Ok(())
    }

    fn save_all(&mut self, values: &[(ConfigKey, Scalar)]) -> ConfigResult<()> {
        let mut map = self.read_map()?;
        for &(key, value) in values {
            map.insert(key.as_str().to_string(), value);
        }
        self.write_map(&map)?;
        debug!(count = values.len(), path = %self.path.display(), "settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.load_scalar(ConfigKey::Setpoint).unwrap(), None);
        store
            .save_scalar(ConfigKey::Setpoint, Scalar::Real(50.0))
            .unwrap();
        assert_eq!(
            store.load_scalar(ConfigKey::Setpoint).unwrap(),
            Some(Scalar::Real(50.0))
        );
        assert_eq!(store.len(), 1);
    }
}
