use tracing::{debug, warn};

use crate::ranking::{Ranker, RankingError};
use crate::types::{Candidate, ObjectId};

/// A funnel of ranking stages, each narrowing the output of the previous one.
///
/// Stage `i` is asked for `max(target_i, n)` candidates so the funnel never
/// narrows below the final size; the last stage's output is cut to `n`.
#[derive(Debug, Default)]
pub struct RankingPipeline {
    stages: Vec<(Ranker, usize)>,
}

impl RankingPipeline {
    pub fn new(rankers: Vec<Ranker>, targets: Vec<usize>) -> Result<Self, RankingError> {
        if rankers.len() != targets.len() {
            return Err(RankingError::StageCountMismatch {
                stages: rankers.len(),
                targets: targets.len(),
            });
        }
        Ok(Self::from_stages(rankers.into_iter().zip(targets).collect()))
    }

    pub fn from_stages(stages: Vec<(Ranker, usize)>) -> Self {
        for (i, pair) in stages.windows(2).enumerate() {
            if pair[1].1 > pair[0].1 {
                warn!(
                    stage = i + 1,
                    previous_target = pair[0].1,
                    target = pair[1].1,
                    "ranking stage asks for more candidates than the stage before it"
                );
            }
        }
        Self { stages }
    }

    pub fn push_stage(&mut self, ranker: impl Into<Ranker>, target: usize) {
        self.stages.push((ranker.into(), target));
    }

    pub fn stages(&self) -> &[(Ranker, usize)] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn rank(
        &self,
        context: ObjectId,
        mut candidates: Vec<Candidate>,
        n: usize,
    ) -> Result<Vec<Candidate>, RankingError> {
        for (stage, (ranker, target)) in self.stages.iter().enumerate() {
            let requested = (*target).max(n);
            let considered = candidates.len();
            candidates = ranker.rank(context, candidates, requested)?;
            debug!(
                stage,
                ranker = ranker.name(),
                considered,
                requested,
                kept = candidates.len(),
                "ranking stage done"
            );
        }
        candidates.truncate(n);
        Ok(candidates)
    }
}
