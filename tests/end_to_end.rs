use std::fs;
use std::path::Path;
use std::sync::Arc;

use recsys_core::candidates::{DotProductKnn, EmbeddingTable};
use recsys_core::config::{ConfigError, MetricName, PipelineConfig, RankerConfig};
use recsys_core::evaluation::Evaluator;
use recsys_core::features::{EmbeddingScoreExtractor, FeatureManager, FeatureStorage, KeySelector, StaticFeatureExtractor};
use recsys_core::metrics::Reduction;
use recsys_core::recommender::{FunnelRecommender, Recommender};
use recsys_core::types::{Action, Candidate, Embedding, ObjectId};
use tempfile::TempDir;

const CONFIG: &str = r#"{
  "num_candidates": 3,
  "stages": [
    { "target": 3, "ranker": { "kind": "model", "model_path": "linear.json",
                               "numeric_features": ["als", "popularity"] } },
    { "target": 2, "ranker": { "kind": "softmax", "temperature": 0.0, "seed": 1 } }
  ],
  "evaluation": {
    "batch_size": 2,
    "metrics": [
      { "metric": "precision", "k": 2 },
      { "metric": "recall", "k": 2 },
      { "metric": "ndcg", "k": 2 },
      { "metric": "category_diversity", "k": 2 }
    ]
  }
}"#;

fn table(rows: &[(u64, [f32; 2])]) -> EmbeddingTable {
    rows.iter()
        .map(|(id, v)| (ObjectId::new(*id), Embedding::new(v.to_vec())))
        .collect()
}

fn users() -> EmbeddingTable {
    table(&[(1, [1.0, 0.0]), (2, [0.0, 1.0])])
}

fn items() -> EmbeddingTable {
    table(&[(10, [1.0, 0.0]), (11, [0.5, 0.5]), (12, [0.0, 1.0]), (13, [0.75, 0.25])])
}

fn embedding_storage(embeddings: &EmbeddingTable) -> Arc<FeatureStorage> {
    let mut storage = FeatureStorage::new();
    storage
        .add_feature(
            "als",
            embeddings.iter().map(|(id, e)| (*id, e.clone())),
            Embedding::new(vec![0.0, 0.0]),
        )
        .unwrap();
    Arc::new(storage)
}

fn features() -> FeatureManager {
    let mut popularity = FeatureStorage::new();
    popularity.add_feature("popularity", vec![(11u64, 5.0), (13, 1.0)], 0.0).unwrap();

    let mut manager = FeatureManager::default();
    manager.add_extractor(EmbeddingScoreExtractor::new(
        embedding_storage(&users()),
        embedding_storage(&items()),
        ["als"],
    ));
    manager.add_extractor(
        StaticFeatureExtractor::new(Arc::new(popularity), ["popularity"], KeySelector::Candidate).unwrap(),
    );
    manager
}

fn history() -> Vec<Action> {
    vec![
        Action::new(1, 1u64, 10u64).with_category("A"),
        Action::new(2, 2u64, 12u64).with_category("B"),
        Action::new(3, 3u64, 11u64).with_category("B"),
        Action::new(3, 3u64, 13u64).with_category("A"),
    ]
}

fn write_config(dir: &Path) -> PipelineConfig {
    fs::write(dir.join("linear.json"), r#"{"weights": [1.0, 0.25], "bias": 0.0}"#).unwrap();
    fs::write(dir.join("pipeline.json"), CONFIG).unwrap();
    PipelineConfig::from_path(&dir.join("pipeline.json")).unwrap()
}

fn recommender(config: &PipelineConfig, base_dir: &Path) -> FunnelRecommender<DotProductKnn> {
    let knn = DotProductKnn::new(Arc::new(users()), Arc::new(items())).unwrap();
    let pipeline = config.build_pipeline(base_dir).unwrap();
    FunnelRecommender::new(knn, features(), pipeline, config.num_candidates)
}

fn ids(recommender: &impl Recommender, user: u64) -> Vec<u64> {
    recommender
        .recommend(ObjectId::new(user), 2)
        .unwrap()
        .iter()
        .map(|c| c.id().get())
        .collect()
}

#[test]
fn test_config_parses() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    assert_eq!(config.num_candidates, 3);
    assert_eq!(config.stages.len(), 2);
    assert!(matches!(config.stages[0].ranker, RankerConfig::Model(_)));
    match &config.stages[1].ranker {
        RankerConfig::Softmax(softmax) => {
            assert_eq!(softmax.temperature, 0.0);
            assert_eq!(softmax.relevance_feature, "model_relevance");
        }
        other => panic!("expected softmax stage, got {other:?}"),
    }
    assert_eq!(config.evaluation.batch_size, 2);
    assert_eq!(config.evaluation.metrics[3].metric, MetricName::CategoryDiversity);
    assert_eq!(config.evaluation.metrics[0].reduction, Reduction::Mean);
}

#[test]
fn test_config_defaults() {
    let config: PipelineConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, PipelineConfig::default());
    assert_eq!(config.num_candidates, 100);
    assert_eq!(config.evaluation.batch_size, 1);
}

#[test]
fn test_config_rejects_unknown_ranker() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("pipeline.json");
    fs::write(&path, r#"{"stages": [{"target": 5, "ranker": {"kind": "oracle"}}]}"#).unwrap();
    assert!(matches!(PipelineConfig::from_path(&path), Err(ConfigError::Parse(_))));
}

#[test]
fn test_config_missing_model_file() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("pipeline.json"), CONFIG).unwrap();
    let config = PipelineConfig::from_path(&temp.path().join("pipeline.json")).unwrap();
    assert!(matches!(config.build_pipeline(temp.path()), Err(ConfigError::Ranking(_))));
}

#[test]
fn test_funnel_recommends() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    let recommender = recommender(&config, temp.path());

    // User 1 retrieves [10, 13, 11]; popularity lifts 11 above the tie of 10 and 13
    assert_eq!(ids(&recommender, 1), vec![11, 10]);
    assert_eq!(ids(&recommender, 2), vec![11, 12]);
}

#[test]
fn invariant_funnel_batch_matches_single() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    let recommender = recommender(&config, temp.path());

    let users = [ObjectId::new(2), ObjectId::new(1)];
    let batched = recommender.recommend_batch(&users, 2).unwrap();
    for (user, batch) in users.iter().zip(&batched) {
        assert_eq!(batch, &recommender.recommend(*user, 2).unwrap());
    }
}

#[test]
fn test_funnel_unknown_user() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    let recommender = recommender(&config, temp.path());
    assert!(recommender.recommend(ObjectId::new(99), 2).is_err());
}

#[test]
fn test_evaluate_configured_funnel() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    let recommender = recommender(&config, temp.path());

    let mut evaluator = Evaluator::new(config.build_metrics(&history())).unwrap();
    evaluator.load_test_actions(&[Action::new(1, 1u64, 11u64), Action::new(2, 2u64, 12u64)]);
    let report = evaluator
        .evaluate_recommender(&recommender, config.evaluation.batch_size)
        .unwrap();

    assert_eq!(report.requests, 2);
    assert_eq!(report.get("precision@2"), Some(0.5));
    assert_eq!(report.get("recall@2"), Some(1.0));
    let ndcg = report.get("NDCG@2").unwrap();
    assert!((ndcg - (1.0 + 2f64.ln() / 3f64.ln()) / 2.0).abs() < 1e-12);
    assert_eq!(report.get("category_diversity@2"), Some(0.75));
}

#[test]
fn test_widening_stage_targets_still_return_n() {
    let config: PipelineConfig = serde_json::from_str(
        r#"{
          "stages": [
            { "target": 2, "ranker": { "kind": "feature", "feature": "score" } },
            { "target": 4, "ranker": { "kind": "feature", "feature": "score", "order": "ascending" } }
          ]
        }"#,
    )
    .unwrap();
    let pipeline = config.build_pipeline(Path::new(".")).unwrap();
    assert_eq!(pipeline.len(), 2);

    let candidates = || (1..=6u64).map(|id| Candidate::new(id).with_feature("score", id as f64)).collect::<Vec<_>>();
    let ids = |n: usize| -> Vec<u64> {
        pipeline
            .rank(ObjectId::new(1), candidates(), n)
            .unwrap()
            .iter()
            .map(|c| c.id().get())
            .collect()
    };

    // The second stage cannot widen past what the first kept
    assert_eq!(ids(3), vec![4, 5, 6]);
    assert_eq!(ids(1), vec![5]);
}
