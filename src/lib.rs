//! Multi-stage recommendation funnel with an offline evaluation harness.
//!
//! `recsys-core` retrieves candidates by embedding similarity, enriches them
//! with named features, narrows them through ranking stages (feature sort,
//! model score, Gumbel-max exploration) and replays held-out request logs to
//! report quality, novelty and diversity metrics. Orderings are
//! deterministic: score ties are always broken by ascending object id.
//!
//! ```text
//! retrieve (candidates) → enrich (features) → rank (ranking) → score (metrics)
//! ```

pub mod candidates;
pub mod config;
pub mod evaluation;
pub mod features;
pub mod metrics;
pub mod ranking;
pub mod recommender;
pub mod snapshot;
pub mod types;
