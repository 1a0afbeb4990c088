pub mod config;
pub mod domain;
pub mod scheduler;
pub mod shutdown;
pub mod state;
pub mod storage;
pub mod utils;

use domain::prediction::PredictionGenerator;
use domain::sensor::ReadingGenerator;
use scheduler::spawn_periodic;
use state::AppState;
use tokio::task::JoinHandle;

/// Spawn the reading and prediction generators on their configured intervals.
/// The returned handles run until aborted.
pub fn spawn_pipeline(state: &AppState) -> Vec<JoinHandle<()>> {
    let readings = ReadingGenerator::new(state.readings.clone());
    let predictions = PredictionGenerator::new(
        state.readings.clone(),
        state.predictions.clone(),
        state.notifier.clone(),
        state.scorer.clone(),
        state.config.coord_update_interval,
    );

    vec![
        spawn_periodic(readings, state.config.reading_interval),
        spawn_periodic(predictions, state.config.prediction_interval),
    ]
}
