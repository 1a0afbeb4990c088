use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_TICK_SECS: u64 = 5;
const DEFAULT_COORD_UPDATE_SECS: u64 = 60;
const DEFAULT_MODEL_SEED: u64 = 42;

/// 애플리케이션 설정
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the append-only CSV logs
    pub data_dir: PathBuf,
    /// Directory for rolling application logs
    pub log_dir: String,
    pub reading_interval: Duration,
    pub prediction_interval: Duration,
    /// Minimum time between two moves of the predicted location
    pub coord_update_interval: Duration,
    pub model_seed: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log_dir: DEFAULT_LOG_DIR.to_string(),
            reading_interval: Duration::from_secs(DEFAULT_TICK_SECS),
            prediction_interval: Duration::from_secs(DEFAULT_TICK_SECS),
            coord_update_interval: Duration::from_secs(DEFAULT_COORD_UPDATE_SECS),
            model_seed: DEFAULT_MODEL_SEED,
        }
    }
}

impl AppConfig {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());

        let reading_interval = interval_from_env("READING_INTERVAL_SECS", DEFAULT_TICK_SECS)?;
        let prediction_interval =
            interval_from_env("PREDICTION_INTERVAL_SECS", DEFAULT_TICK_SECS)?;
        let coord_update_interval =
            interval_from_env("COORD_UPDATE_INTERVAL_SECS", DEFAULT_COORD_UPDATE_SECS)?;

        let model_seed = match env::var("MODEL_SEED") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidSeed(raw))?,
            Err(_) => DEFAULT_MODEL_SEED,
        };

        Ok(Self {
            data_dir,
            log_dir,
            reading_interval,
            prediction_interval,
            coord_update_interval,
            model_seed,
        })
    }

    pub fn readings_path(&self) -> PathBuf {
        self.data_dir.join("sensors.csv")
    }

    pub fn predictions_path(&self) -> PathBuf {
        self.data_dir.join("prediction.csv")
    }

    pub fn notifications_path(&self) -> PathBuf {
        self.data_dir.join("notifications.csv")
    }

    pub fn sensor_health_path(&self) -> PathBuf {
        self.data_dir.join("sensor_health.csv")
    }
}

fn interval_from_env(key: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    let secs = match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidInterval { key, value: raw })?,
        Err(_) => default_secs,
    };

    if secs == 0 {
        return Err(ConfigError::ZeroInterval(key));
    }

    Ok(Duration::from_secs(secs))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid interval for {key}: {value}")]
    InvalidInterval { key: &'static str, value: String },
    #[error("Interval {0} must be greater than zero")]
    ZeroInterval(&'static str),
    #[error("Invalid model seed: {0}")]
    InvalidSeed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_use_documented_defaults() {
        // Act
        let config = AppConfig::default();

        // Assert
        assert_eq!(config.reading_interval, Duration::from_secs(5));
        assert_eq!(config.prediction_interval, Duration::from_secs(5));
        assert_eq!(config.coord_update_interval, Duration::from_secs(60));
        assert_eq!(config.model_seed, 42);
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.readings_path(), PathBuf::from("data/sensors.csv"));
        assert_eq!(config.predictions_path(), PathBuf::from("data/prediction.csv"));
        assert_eq!(
            config.notifications_path(),
            PathBuf::from("data/notifications.csv")
        );
    }

    // 환경 변수는 프로세스 전역이므로 테스트 간 충돌을 피하기 위해 고유한 키를 사용
    #[test]
    fn should_reject_non_numeric_interval() {
        // Arrange
        env::set_var("ROCKFALL_TEST_BAD_INTERVAL", "five");

        // Act
        let result = interval_from_env("ROCKFALL_TEST_BAD_INTERVAL", 5);

        // Assert
        assert!(matches!(
            result,
            Err(ConfigError::InvalidInterval { value, .. }) if value == "five"
        ));
    }

    #[test]
    fn should_reject_zero_interval() {
        // Arrange
        env::set_var("ROCKFALL_TEST_ZERO_INTERVAL", "0");

        // Act
        let result = interval_from_env("ROCKFALL_TEST_ZERO_INTERVAL", 5);

        // Assert
        assert!(matches!(
            result,
            Err(ConfigError::ZeroInterval("ROCKFALL_TEST_ZERO_INTERVAL"))
        ));
    }

    #[test]
    fn should_fall_back_to_default_when_unset() {
        // Act
        let result = interval_from_env("ROCKFALL_TEST_UNSET_INTERVAL", 7);

        // Assert
        assert_eq!(result.unwrap(), Duration::from_secs(7));
    }
}
