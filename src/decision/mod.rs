pub mod engine;

pub use engine::{DecisionResult, DecisionSource, DecisionStats, HybridDecisionEngine};
