//! Risk inference: feature extraction, the trained model, and the
//! bounded-output scorer wrapped around it

pub mod forest;
pub mod scorer;

pub use forest::{ForestConfig, RiskForest};
pub use scorer::{RiskFeatureVector, RiskModel, RiskScorer, FEATURE_COUNT};
