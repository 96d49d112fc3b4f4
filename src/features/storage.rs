use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::features::FeatureError;
use crate::snapshot::{self, SnapshotError, SnapshotManifest};
use crate::types::{Feature, FeatureKey, FeatureMap};

static EMPTY: FeatureMap = FeatureMap::new();

const SNAPSHOT_KIND: &str = "feature_storage";

/// Keyed store of named feature values with per-feature defaults.
///
/// Built once, then shared read-only (typically behind an `Arc`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureStorage {
    #[serde(with = "sorted_entries")]
    fmap: HashMap<FeatureKey, FeatureMap>,
    names: Vec<String>,
    defaults: BTreeMap<String, Feature>,
}

impl FeatureStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored features for `key`. Unknown keys yield an empty map.
    pub fn get(&self, key: impl Into<FeatureKey>) -> &FeatureMap {
        self.fmap.get(&key.into()).unwrap_or(&EMPTY)
    }

    /// Register `name` over many keys at once.
    ///
    /// Values already stored under the same key and name are overwritten, and
    /// `default` replaces any earlier default for `name`. Non-finite numbers
    /// (including embedding components) are rejected before anything is
    /// written, since a snapshot could not restore them.
    pub fn add_feature<K, V>(
        &mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = (K, V)>,
        default: impl Into<Feature>,
    ) -> Result<(), FeatureError>
    where
        K: Into<FeatureKey>,
        V: Into<Feature>,
    {
        let name = name.into();
        let default = default.into();
        let values: Vec<(FeatureKey, Feature)> = values
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        if !is_finite(&default) || values.iter().any(|(_, value)| !is_finite(value)) {
            return Err(FeatureError::NonFinite(name));
        }

        let written = values.len();
        for (key, value) in values {
            self.fmap.entry(key).or_default().insert(name.clone(), value);
        }
        if !self.names.contains(&name) {
            self.names.push(name.clone());
        }
        debug!(feature = %name, keys = written, "feature registered");
        self.defaults.insert(name, default);
        Ok(())
    }

    pub fn get_feature_default(&self, name: &str) -> Result<&Feature, FeatureError> {
        self.defaults
            .get(name)
            .ok_or_else(|| FeatureError::UnknownFeature(name.to_string()))
    }

    /// Stored value of `name` for `key`, falling back to the registered default.
    pub fn value(&self, key: impl Into<FeatureKey>, name: &str) -> Result<&Feature, FeatureError> {
        match self.get(key).get(name) {
            Some(value) => Ok(value),
            None => self.get_feature_default(name),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains_feature(&self, name: &str) -> bool {
        self.defaults.contains_key(name)
    }

    /// Number of keys holding at least one stored value.
    pub fn len(&self) -> usize {
        self.fmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fmap.is_empty()
    }

    pub fn save(&self, output_dir: &Path) -> Result<SnapshotManifest, SnapshotError> {
        snapshot::write_snapshot(self, SNAPSHOT_KIND, output_dir)
    }

    pub fn load(dir: &Path) -> Result<Self, SnapshotError> {
        let (storage, _) = snapshot::read_snapshot(dir, SNAPSHOT_KIND)?;
        Ok(storage)
    }
}

fn is_finite(value: &Feature) -> bool {
    match value {
        Feature::Number(number) => number.is_finite(),
        Feature::Category(_) => true,
        Feature::Embedding(embedding) => embedding.as_slice().iter().all(|x| x.is_finite()),
    }
}

// HashMap iteration order is random; entries are written sorted by key so
// identical stores always produce identical payloads.
mod sorted_entries {
    use std::collections::HashMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::types::{FeatureKey, FeatureMap};

    pub fn serialize<S>(fmap: &HashMap<FeatureKey, FeatureMap>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut entries: Vec<(&FeatureKey, &FeatureMap)> = fmap.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        serializer.collect_seq(entries)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<HashMap<FeatureKey, FeatureMap>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries: Vec<(FeatureKey, FeatureMap)> = Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}
