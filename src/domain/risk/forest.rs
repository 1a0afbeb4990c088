//! Bagged regression-tree ensemble
//!
//! Trained once at startup on uniform synthetic data. It only exists to give
//! the scorer a non-trivial, deterministic response surface; its output is
//! not a calibrated risk.

use crate::domain::risk::scorer::{RiskFeatureVector, RiskModel, FEATURE_COUNT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing::info;

/// Training parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub n_samples: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 120,
            max_depth: 4,
            min_samples_split: 4,
            n_samples: 500,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

type Sample = ([f64; FEATURE_COUNT], f64);

fn mean(samples: &[Sample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|(_, y)| y).sum::<f64>() / samples.len() as f64
}

/// Best variance-reducing split as (feature, threshold), if any
fn best_split(samples: &[Sample]) -> Option<(usize, f64)> {
    if samples.len() < 2 {
        return None;
    }

    let n = samples.len() as f64;
    let total: f64 = samples.iter().map(|(_, y)| y).sum();
    let mut best: Option<(usize, f64, f64)> = None;

    for feature in 0..FEATURE_COUNT {
        let mut sorted: Vec<&Sample> = samples.iter().collect();
        sorted.sort_by(|a, b| a.0[feature].total_cmp(&b.0[feature]));

        let mut left_sum = 0.0;
        for i in 0..sorted.len() - 1 {
            left_sum += sorted[i].1;
            let (here, next) = (sorted[i].0[feature], sorted[i + 1].0[feature]);
            if here == next {
                continue;
            }

            let left_n = (i + 1) as f64;
            let right_n = n - left_n;
            // Maximizing this is equivalent to minimizing the summed squared error
            let score = left_sum * left_sum / left_n + (total - left_sum).powi(2) / right_n;

            if best.map_or(true, |(_, _, s)| score > s) {
                best = Some((feature, (here + next) / 2.0, score));
            }
        }
    }

    best.map(|(feature, threshold, _)| (feature, threshold))
}

fn grow(samples: &[Sample], depth: usize, config: &ForestConfig) -> Node {
    if depth >= config.max_depth || samples.len() < config.min_samples_split {
        return Node::Leaf(mean(samples));
    }

    let Some((feature, threshold)) = best_split(samples) else {
        return Node::Leaf(mean(samples));
    };

    let (left, right): (Vec<Sample>, Vec<Sample>) =
        samples.iter().partition(|(x, _)| x[feature] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(&left, depth + 1, config)),
        right: Box::new(grow(&right, depth + 1, config)),
    }
}

/// Ensemble of regression trees averaged at prediction time
#[derive(Debug, Clone)]
pub struct RiskForest {
    trees: Vec<Node>,
}

impl RiskForest {
    /// Train with the default parameters and the given seed
    pub fn train(seed: u64) -> Self {
        Self::train_with(ForestConfig {
            seed,
            ..ForestConfig::default()
        })
    }

    pub fn train_with(config: ForestConfig) -> Self {
        let started = Instant::now();
        let mut rng = StdRng::seed_from_u64(config.seed);

        let samples: Vec<Sample> = (0..config.n_samples)
            .map(|_| {
                let mut x = [0.0; FEATURE_COUNT];
                x.iter_mut().for_each(|v| *v = rng.gen::<f64>());
                (x, rng.gen::<f64>())
            })
            .collect();

        let trees = (0..config.n_trees)
            .map(|_| {
                let bootstrap: Vec<Sample> = (0..samples.len())
                    .map(|_| samples[rng.gen_range(0..samples.len())])
                    .collect();
                grow(&bootstrap, 0, &config)
            })
            .collect();

        info!(
            n_trees = config.n_trees,
            max_depth = config.max_depth,
            seed = config.seed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Risk model trained"
        );

        Self { trees }
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

impl RiskModel for RiskForest {
    fn predict(&self, features: &RiskFeatureVector) -> f64 {
        if self.trees.is_empty() {
            return f64::NAN;
        }
        let x = features.as_array();
        self.trees.iter().map(|tree| tree.predict(&x)).sum::<f64>() / self.trees.len() as f64
    }
}
