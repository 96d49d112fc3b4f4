use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Gumbel};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ranking::select::{numeric_feature, select_top_n, Order};
use crate::ranking::RankingError;
use crate::types::{Candidate, ObjectId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftmaxSamplerConfig {
    pub temperature: f64,
    pub relevance_feature: String,
    pub sampled_feature: String,
    /// Fixed seed for reproducible sampling; entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for SoftmaxSamplerConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            relevance_feature: "model_relevance".into(),
            sampled_feature: "sampled_relevance".into(),
            seed: None,
        }
    }
}

/// Exploration stage based on the Gumbel-max trick.
///
/// Each candidate's relevance is perturbed by `temperature` times a standard
/// Gumbel draw and the top `n` perturbed values are kept, which samples `n`
/// candidates without replacement from `softmax(relevance / temperature)`.
/// Temperature 0 is plain top-n by relevance; a large temperature approaches
/// uniform sampling.
#[derive(Debug)]
pub struct SoftmaxSampler {
    config: SoftmaxSamplerConfig,
    gumbel: Gumbel<f64>,
    rng: Mutex<StdRng>,
}

impl SoftmaxSampler {
    pub fn new(config: SoftmaxSamplerConfig) -> Result<Self, RankingError> {
        if !config.temperature.is_finite() || config.temperature < 0.0 {
            return Err(RankingError::InvalidTemperature(config.temperature));
        }
        let gumbel = Gumbel::new(0.0, 1.0).map_err(|e| RankingError::Noise(e.to_string()))?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            gumbel,
            rng: Mutex::new(rng),
        })
    }

    pub fn config(&self) -> &SoftmaxSamplerConfig {
        &self.config
    }

    pub fn rank(
        &self,
        context: ObjectId,
        mut candidates: Vec<Candidate>,
        n: usize,
    ) -> Result<Vec<Candidate>, RankingError> {
        let relevances = candidates
            .iter()
            .map(|candidate| numeric_feature(candidate, &self.config.relevance_feature))
            .collect::<Result<Vec<f64>, _>>()?;

        {
            // A poisoned lock still holds a usable generator
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            for (candidate, relevance) in candidates.iter_mut().zip(relevances) {
                // Temperature 0 must not meet an infinite draw (inf * 0 is NaN)
                let perturbed = if self.config.temperature > 0.0 {
                    relevance + self.gumbel.sample(&mut *rng) * self.config.temperature
                } else {
                    relevance
                };
                candidate.set_feature(self.config.sampled_feature.clone(), perturbed)?;
            }
        }

        debug!(
            context = %context,
            pool = candidates.len(),
            n,
            temperature = self.config.temperature,
            "softmax sampling"
        );
        select_top_n(candidates, &self.config.sampled_feature, n, Order::Descending)
    }
}
