use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::features::{FeatureError, FeatureExtractor};
use crate::snapshot::{self, SnapshotError, SnapshotManifest};
use crate::types::{Candidate, ObjectId};

const SNAPSHOT_KIND: &str = "feature_manager";

/// Composes extractors into a single enrichment pass over candidates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureManager {
    extractors: Vec<FeatureExtractor>,
}

impl FeatureManager {
    pub fn new(extractors: Vec<FeatureExtractor>) -> Self {
        Self { extractors }
    }

    pub fn add_extractor(&mut self, extractor: impl Into<FeatureExtractor>) {
        self.extractors.push(extractor.into());
    }

    pub fn extractors(&self) -> &[FeatureExtractor] {
        &self.extractors
    }

    /// Lazily enrich `candidates` for `context`.
    ///
    /// Extractors run in registration order when a candidate is pulled, so a
    /// later extractor overrides an earlier one on a shared feature name.
    /// Candidates that are never pulled are never looked up.
    pub fn extract<I>(&self, context: ObjectId, candidates: I) -> Enrich<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Candidate>,
    {
        Enrich {
            manager: self,
            context,
            candidates: candidates.into_iter(),
        }
    }

    pub fn save(&self, output_dir: &Path) -> Result<SnapshotManifest, SnapshotError> {
        snapshot::write_snapshot(self, SNAPSHOT_KIND, output_dir)
    }

    pub fn load(dir: &Path) -> Result<Self, SnapshotError> {
        let (manager, _) = snapshot::read_snapshot(dir, SNAPSHOT_KIND)?;
        Ok(manager)
    }
}

/// Iterator returned by [`FeatureManager::extract`].
pub struct Enrich<'a, I> {
    manager: &'a FeatureManager,
    context: ObjectId,
    candidates: I,
}

impl<I> Iterator for Enrich<'_, I>
where
    I: Iterator<Item = Candidate>,
{
    type Item = Result<Candidate, FeatureError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut candidate = self.candidates.next()?;
        for extractor in &self.manager.extractors {
            let merged = extractor
                .extract(self.context, candidate.id())
                .and_then(|features| candidate.merge(features).map_err(FeatureError::from));
            if let Err(err) = merged {
                return Some(Err(err));
            }
        }
        Some(Ok(candidate))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.candidates.size_hint()
    }
}
