use recsys_core::ranking::{FeatureRanker, RankingError, SoftmaxSampler, SoftmaxSamplerConfig};
use recsys_core::types::{Candidate, ObjectId};

const CONTEXT: ObjectId = ObjectId::new(1);

fn sampler(temperature: f64, seed: u64) -> SoftmaxSampler {
    SoftmaxSampler::new(SoftmaxSamplerConfig {
        temperature,
        seed: Some(seed),
        ..SoftmaxSamplerConfig::default()
    })
    .unwrap()
}

fn pool(relevances: &[f64]) -> Vec<Candidate> {
    relevances
        .iter()
        .enumerate()
        .map(|(i, rel)| Candidate::new(i as u64).with_feature("model_relevance", *rel))
        .collect()
}

fn ids(candidates: &[Candidate]) -> Vec<u64> {
    candidates.iter().map(|c| c.id().get()).collect()
}

#[test]
fn invariant_zero_temperature_is_top_n() {
    let relevances = [0.3, 0.9, 0.1, 0.9, 0.5, 0.7];
    let expected = FeatureRanker::descending("model_relevance")
        .rank(CONTEXT, pool(&relevances), 4)
        .unwrap();

    let sampler = sampler(0.0, 11);
    for _ in 0..20 {
        let sampled = sampler.rank(CONTEXT, pool(&relevances), 4).unwrap();
        assert_eq!(ids(&sampled), ids(&expected));
    }
    assert_eq!(ids(&expected), vec![1, 3, 5, 4]);
}

#[test]
fn test_sampled_relevance_is_written() {
    let sampler = sampler(0.5, 3);
    let sampled = sampler.rank(CONTEXT, pool(&[1.0, 2.0, 3.0]), 3).unwrap();

    assert_eq!(sampled.len(), 3);
    let values: Vec<f64> = sampled.iter().map(|c| c.number("sampled_relevance").unwrap()).collect();
    assert!(values.windows(2).all(|w| w[0] >= w[1]));
    // Original relevance is kept
    assert!(sampled.iter().all(|c| c.number("model_relevance").is_some()));
}

#[test]
fn test_sampling_without_replacement() {
    let sampler = sampler(10.0, 5);
    for _ in 0..50 {
        let mut sampled = ids(&sampler.rank(CONTEXT, pool(&[0.0; 8]), 8).unwrap());
        sampled.sort_unstable();
        assert_eq!(sampled, (0..8).collect::<Vec<u64>>());
    }
}

#[test]
fn invariant_high_temperature_is_near_uniform() {
    let sampler = sampler(1000.0, 42);
    let relevances = [0.0, 1.0, 2.0, 3.0, 4.0];
    let mut counts = [0usize; 5];
    for _ in 0..5000 {
        let top = sampler.rank(CONTEXT, pool(&relevances), 1).unwrap();
        counts[top[0].id().get() as usize] += 1;
    }
    for (id, count) in counts.iter().enumerate() {
        assert!((850..=1150).contains(count), "candidate {id} drawn {count} times");
    }
}

#[test]
fn test_unit_temperature_follows_softmax() {
    // softmax([0, ln 3]) = [0.25, 0.75]
    let sampler = sampler(1.0, 7);
    let relevances = [0.0, 3.0f64.ln()];
    let mut second = 0usize;
    for _ in 0..4000 {
        let top = sampler.rank(CONTEXT, pool(&relevances), 1).unwrap();
        if top[0].id().get() == 1 {
            second += 1;
        }
    }
    assert!((2850..=3150).contains(&second), "drawn {second} times");
}

#[test]
fn test_seeded_sampling_is_reproducible() {
    let relevances = [0.2, 0.4, 0.6, 0.8, 1.0, 1.2];
    let first = sampler(0.5, 99);
    let second = sampler(0.5, 99);
    for _ in 0..10 {
        assert_eq!(
            ids(&first.rank(CONTEXT, pool(&relevances), 3).unwrap()),
            ids(&second.rank(CONTEXT, pool(&relevances), 3).unwrap())
        );
    }
}

#[test]
fn test_invalid_temperature() {
    for temperature in [-0.1, f64::NAN, f64::INFINITY] {
        let result = SoftmaxSampler::new(SoftmaxSamplerConfig {
            temperature,
            ..SoftmaxSamplerConfig::default()
        });
        assert!(matches!(result, Err(RankingError::InvalidTemperature(_))));
    }
}

#[test]
fn test_missing_relevance() {
    let sampler = sampler(0.1, 1);
    let candidates = vec![Candidate::new(1u64)];
    let result = sampler.rank(CONTEXT, candidates, 1);
    assert!(matches!(result, Err(RankingError::MissingFeature { .. })));
}

#[test]
fn test_sampled_feature_keeps_its_kind() {
    let sampler = sampler(0.5, 2);
    let candidates = vec![Candidate::new(1u64)
        .with_feature("model_relevance", 0.3)
        .with_feature("sampled_relevance", "cached")];

    let result = sampler.rank(CONTEXT, candidates, 1);
    assert!(matches!(
        result,
        Err(RankingError::WrongKind { feature, .. }) if feature == "sampled_relevance"
    ));
}

#[test]
fn test_zero_temperature_leaves_relevance_unperturbed() {
    let sampler = sampler(0.0, 8);
    let sampled = sampler.rank(CONTEXT, pool(&[0.25, 0.5]), 2).unwrap();
    for candidate in &sampled {
        assert_eq!(candidate.number("sampled_relevance"), candidate.number("model_relevance"));
    }
}
