//! Synthetic sensor reading generator
//!
//! Each channel is a bounded random walk: a small signed step per tick,
//! clamped to the channel's operating band, so consecutive readings stay
//! correlated instead of jumping around.

use crate::domain::sensor::dto::{EventType, SensorReading};
use crate::scheduler::{PeriodicTask, TickOutcome};
use crate::storage::AppendLog;
use crate::utils::AppError;
use async_trait::async_trait;
use chrono::{Local, Timelike};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument};

/// Operating band and walk parameters of one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelBand {
    pub name: &'static str,
    /// Range the first value is drawn from
    pub initial: (f64, f64),
    pub min: f64,
    pub max: f64,
    /// Largest change per tick
    pub step: f64,
    /// Decimals kept in the log
    pub decimals: i32,
}

pub const ACCELEROMETER_X: ChannelBand = ChannelBand {
    name: "accelerometer_x",
    initial: (0.15, 0.25),
    min: 0.05,
    max: 0.4,
    step: 0.03,
    decimals: 3,
};

pub const ACCELEROMETER_Y: ChannelBand = ChannelBand {
    name: "accelerometer_y",
    ..ACCELEROMETER_X
};

pub const ACCELEROMETER_Z: ChannelBand = ChannelBand {
    name: "accelerometer_z",
    initial: (9.7, 9.9),
    min: 9.6,
    max: 10.2,
    step: 0.05,
    decimals: 3,
};

pub const INCLINOMETER: ChannelBand = ChannelBand {
    name: "inclinometer",
    initial: (24.0, 28.0),
    min: 20.0,
    max: 35.0,
    step: 0.5,
    decimals: 2,
};

pub const EXTENSOMETER: ChannelBand = ChannelBand {
    name: "extensometer",
    initial: (2.0, 2.5),
    min: 1.5,
    max: 3.5,
    step: 0.1,
    decimals: 2,
};

pub const PIEZOMETER: ChannelBand = ChannelBand {
    name: "piezometer",
    initial: (150.0, 180.0),
    min: 120.0,
    max: 220.0,
    step: 3.0,
    decimals: 1,
};

/// Channels in reading order: ax, ay, az, inclinometer, extensometer, piezometer
pub const CHANNELS: [ChannelBand; 6] = [
    ACCELEROMETER_X,
    ACCELEROMETER_Y,
    ACCELEROMETER_Z,
    INCLINOMETER,
    EXTENSOMETER,
    PIEZOMETER,
];

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Move `value` by a uniform step in `[-step, step]`, clamped to `[min, max]`
pub fn jitter<R: Rng + ?Sized>(rng: &mut R, value: f64, min: f64, max: f64, step: f64) -> f64 {
    (value + rng.gen_range(-step..=step)).clamp(min, max)
}

/// Current value of every channel, owned by one generator
#[derive(Debug, Clone, PartialEq)]
pub struct Baselines {
    values: [f64; 6],
}

impl Baselines {
    /// Draw each channel from its initial band
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut values = [0.0; 6];
        for (value, channel) in values.iter_mut().zip(CHANNELS.iter()) {
            *value = round_to(rng.gen_range(channel.initial.0..=channel.initial.1), channel.decimals);
        }
        Self { values }
    }

    /// Start from explicit values, clamped into their bands
    pub fn from_values(values: [f64; 6]) -> Self {
        let mut clamped = values;
        for (value, channel) in clamped.iter_mut().zip(CHANNELS.iter()) {
            *value = value.clamp(channel.min, channel.max);
        }
        Self { values: clamped }
    }

    pub fn values(&self) -> [f64; 6] {
        self.values
    }

    /// Advance every channel by one jitter step
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for (value, channel) in self.values.iter_mut().zip(CHANNELS.iter()) {
            let moved = jitter(rng, *value, channel.min, channel.max, channel.step);
            *value = round_to(moved, channel.decimals);
        }
    }
}

/// Periodically appends one synthetic reading to the readings log
pub struct ReadingGenerator {
    readings: AppendLog<SensorReading>,
    baselines: Baselines,
    rng: StdRng,
}

impl ReadingGenerator {
    /// Create a generator with baselines drawn from the initial bands
    pub fn new(readings: AppendLog<SensorReading>) -> Self {
        Self::with_rng(readings, StdRng::from_entropy())
    }

    /// Create a generator driven by the given RNG
    pub fn with_rng(readings: AppendLog<SensorReading>, mut rng: StdRng) -> Self {
        let baselines = Baselines::random(&mut rng);
        info!(path = %readings.path().display(), "Reading generator initialized");
        Self {
            readings,
            baselines,
            rng,
        }
    }

    /// Replace the starting baselines
    pub fn with_baselines(mut self, baselines: Baselines) -> Self {
        self.baselines = baselines;
        self
    }

    pub fn baselines(&self) -> &Baselines {
        &self.baselines
    }

    /// Advance the walk and build the next reading without persisting it
    pub fn next_reading(&mut self) -> SensorReading {
        self.baselines.advance(&mut self.rng);
        let [ax, ay, az, inclinometer, extensometer, piezometer] = self.baselines.values();

        let event_type = *EventType::ALL
            .choose(&mut self.rng)
            .unwrap_or(&EventType::Normal);

        let now = Local::now().naive_local();
        let timestamp = now.with_nanosecond(0).unwrap_or(now);

        SensorReading {
            timestamp,
            accelerometer_x: ax,
            accelerometer_y: ay,
            accelerometer_z: az,
            inclinometer,
            extensometer,
            piezometer,
            event_type,
        }
    }
}

#[async_trait]
impl PeriodicTask for ReadingGenerator {
    fn name(&self) -> &'static str {
        "reading-generator"
    }

    #[instrument(skip(self), level = "debug")]
    async fn tick(&mut self) -> Result<TickOutcome, AppError> {
        let reading = self.next_reading();
        self.readings.append(&reading).await?;

        debug!(
            ax = reading.accelerometer_x,
            az = reading.accelerometer_z,
            inclinometer = reading.inclinometer,
            event_type = %reading.event_type,
            "Sensor reading appended"
        );

        Ok(TickOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_generator(dir: &TempDir, seed: u64) -> ReadingGenerator {
        let log = AppendLog::new(dir.path().join("sensors.csv"));
        ReadingGenerator::with_rng(log, StdRng::seed_from_u64(seed))
    }

    fn values_of(reading: &SensorReading) -> [f64; 6] {
        [
            reading.accelerometer_x,
            reading.accelerometer_y,
            reading.accelerometer_z,
            reading.inclinometer,
            reading.extensometer,
            reading.piezometer,
        ]
    }

    #[test]
    fn should_clamp_jitter_to_band() {
        // Arrange
        let mut rng = StdRng::seed_from_u64(1);

        // Act & Assert
        for _ in 0..1000 {
            let low = jitter(&mut rng, 0.05, 0.05, 0.4, 0.03);
            let high = jitter(&mut rng, 0.4, 0.05, 0.4, 0.03);
            assert!((0.05..=0.4).contains(&low));
            assert!((0.05..=0.4).contains(&high));
        }
    }

    #[test]
    fn should_start_inside_initial_bands() {
        // Arrange
        let mut rng = StdRng::seed_from_u64(7);

        // Act
        let baselines = Baselines::random(&mut rng);

        // Assert
        for (value, channel) in baselines.values().iter().zip(CHANNELS.iter()) {
            assert!(
                *value >= channel.initial.0 && *value <= channel.initial.1,
                "{} started at {}",
                channel.name,
                value
            );
        }
    }

    #[test]
    fn should_stay_in_band_and_move_at_most_one_step() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let mut generator = create_test_generator(&dir, 42);
        let mut previous = generator.baselines().values();

        // Act & Assert
        for _ in 0..2000 {
            let reading = generator.next_reading();
            let current = values_of(&reading);

            for ((now, before), channel) in current.iter().zip(previous.iter()).zip(CHANNELS.iter()) {
                assert!(
                    *now >= channel.min && *now <= channel.max,
                    "{} left its band: {}",
                    channel.name,
                    now
                );
                let rounding = 0.5 * 10f64.powi(-channel.decimals);
                assert!(
                    (now - before).abs() <= channel.step + rounding + 1e-9,
                    "{} jumped from {} to {}",
                    channel.name,
                    before,
                    now
                );
            }
            previous = current;
        }
    }

    #[test]
    fn should_pin_values_at_band_edges() {
        // Arrange
        let mut baselines = Baselines::from_values([1.0, -1.0, 50.0, 0.0, 10.0, 500.0]);
        let mut rng = StdRng::seed_from_u64(3);

        // Act
        baselines.advance(&mut rng);

        // Assert
        for (value, channel) in baselines.values().iter().zip(CHANNELS.iter()) {
            assert!(*value >= channel.min && *value <= channel.max);
        }
    }

    #[test]
    fn should_label_every_event_type_eventually() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let mut generator = create_test_generator(&dir, 11);

        // Act
        let labels: Vec<EventType> = (0..300).map(|_| generator.next_reading().event_type).collect();

        // Assert
        for event_type in EventType::ALL {
            assert!(labels.contains(&event_type));
        }
    }

    #[tokio::test]
    async fn should_continue_walk_from_given_baselines() {
        // Arrange - every channel pinned at the top of its band
        let dir = TempDir::new().unwrap();
        let top = CHANNELS.map(|channel| channel.max);
        let mut generator = create_test_generator(&dir, 13).with_baselines(Baselines::from_values(top));

        // Act
        generator.tick().await.unwrap();

        // Assert
        let log: AppendLog<SensorReading> = AppendLog::new(dir.path().join("sensors.csv"));
        let reading = log.read_last().await.unwrap().unwrap();
        for ((value, max), channel) in values_of(&reading).iter().zip(top.iter()).zip(CHANNELS.iter()) {
            let rounding = 0.5 * 10f64.powi(-channel.decimals);
            assert!(*value <= channel.max, "{} exceeded its band: {}", channel.name, value);
            assert!(*value >= max - channel.step - rounding - 1e-9);
        }
    }

    #[tokio::test]
    async fn should_append_one_reading_per_tick() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let mut generator = create_test_generator(&dir, 5);

        // Act
        let first = generator.tick().await.unwrap();
        generator.tick().await.unwrap();

        // Assert
        assert_eq!(first, TickOutcome::Completed);
        let log: AppendLog<SensorReading> = AppendLog::new(dir.path().join("sensors.csv"));
        let readings = log.read_all().await.unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(
            values_of(&readings[1]).to_vec(),
            generator.baselines().values().to_vec()
        );
    }
}
