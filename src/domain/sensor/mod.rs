pub mod dto;
pub mod generator;

pub use dto::{EventType, SensorHealth, SensorReading};
pub use generator::{Baselines, ChannelBand, ReadingGenerator, CHANNELS};
