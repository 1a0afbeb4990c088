pub mod monitoring;
pub mod notification;
pub mod prediction;
pub mod risk;
pub mod sensor;
