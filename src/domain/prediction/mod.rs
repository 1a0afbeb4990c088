pub mod dto;
pub mod generator;

pub use dto::{HorizonForecast, Location, Prediction, RiskLevel};
pub use generator::{scale_probability, DriftingLocation, PredictionGenerator, INITIAL_LOCATION};
