use std::path::{Path, PathBuf};

/// 애플리케이션 전역 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("internal error: {0}")]
    InternalError(String),
}

impl AppError {
    /// 에러 코드 반환
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Io { .. } => "STORAGE500",
            AppError::InternalError(_) => "COMMON500",
        }
    }

    /// Whether the failure came from the persistence layer
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, AppError::Io { .. })
    }
}

/// 편의 함수들
impl AppError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        AppError::InternalError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn should_render_io_error_with_path() {
        // Arrange
        let err = AppError::io(
            "data/sensors.csv",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );

        // Act
        let message = err.to_string();

        // Assert
        assert!(message.contains("data/sensors.csv"));
        assert!(message.contains("denied"));
        assert_eq!(err.error_code(), "STORAGE500");
        assert!(err.is_persistence_failure());
    }

    #[test]
    fn should_classify_internal_error() {
        // Arrange
        let err = AppError::internal_error("model missing");

        // Act
        let message = err.to_string();

        // Assert
        assert_eq!(message, "internal error: model missing");
        assert_eq!(err.error_code(), "COMMON500");
        assert!(!err.is_persistence_failure());
    }
}
