use std::{
    collections::BTreeMap,
    path::{
        Path,
        PathBuf,
    },
};

use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

use crate::{
    core::{
        BridgeError,
        Result,
    },
    persistence::{
        load_json_at,
        save_json_at,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Deck,
    Model,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    decks: BTreeMap<String, u64>,
    #[serde(default)]
    models: BTreeMap<String, u64>,
}

impl CacheFile {
    fn namespace(&self, namespace: Namespace) -> &BTreeMap<String, u64> {
        match namespace {
            Namespace::Deck => &self.decks,
            Namespace::Model => &self.models,
        }
    }

    fn namespace_mut(&mut self, namespace: Namespace) -> &mut BTreeMap<String, u64> {
        match namespace {
            Namespace::Deck => &mut self.decks,
            Namespace::Model => &mut self.models,
        }
    }
}

/// Remembers the ids of decks and models this crate created, keyed by the name the
/// caller asked for. Entries are never deleted.
#[derive(Debug)]
pub struct ReferenceCache {
    region: String,
    path: Option<PathBuf>,
    entries: CacheFile,
}

impl ReferenceCache {
    /// Opens the cache for `region`, stored as `<dir>/<region>.json`.
    pub fn open(dir: &Path, region: &str) -> Result<Self> {
        validate_region(region)?;
        let path = dir.join(format!("{}.json", region));
        let entries: CacheFile = load_json_at(&path)?;
        debug!(
            "Opened reference cache '{}' ({} decks, {} models)",
            region,
            entries.decks.len(),
            entries.models.len()
        );
        Ok(Self { region: region.to_string(), path: Some(path), entries })
    }

    pub fn in_memory(region: &str) -> Self {
        Self { region: region.to_string(), path: None, entries: CacheFile::default() }
    }

    pub fn get(&self, namespace: Namespace, name: &str) -> Option<u64> {
        self.entries.namespace(namespace).get(name).copied()
    }

    /// Records `name -> id` and persists the whole region before returning.
    pub fn put(&mut self, namespace: Namespace, name: &str, id: u64) -> Result<()> {
        let previous = self.entries.namespace_mut(namespace).insert(name.to_string(), id);
        if previous == Some(id) {
            return Ok(());
        }
        if let Some(path) = &self.path {
            if let Err(err) = save_json_at(&self.entries, path) {
                match previous {
                    Some(previous) => {
                        self.entries.namespace_mut(namespace).insert(name.to_string(), previous);
                    }
                    None => {
                        self.entries.namespace_mut(namespace).remove(name);
                    }
                }
                return Err(err);
            }
        }
        debug!("Cached {:?} '{}' -> {} in region '{}'", namespace, name, id, self.region);
        Ok(())
    }
}

fn validate_region(region: &str) -> Result<()> {
    let trimmed = region.trim();
    if trimmed.is_empty()
        || trimmed != region
        || region.contains(['/', '\\'])
        || region.contains("..")
    {
        return Err(BridgeError::InvalidRegion(region.to_string()));
    }
    Ok(())
}
