//! 로깅 초기화 모듈
//!
//! stdout과 일별 로그 파일에 JSON 이벤트를 동시에 기록합니다.
//! 생성기 태스크 이름은 `run_loop` span 필드(`task`)로 함께 남습니다.

use tracing::dispatcher::SetGlobalDefaultError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Daily files are named `monitor.log.YYYY-MM-DD`
pub const LOG_FILE_PREFIX: &str = "monitor.log";

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "info,rockfall_monitor=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// 로깅 시스템을 초기화합니다.
///
/// 반환되는 `WorkerGuard`를 main에서 유지해야 종료 시 버퍼링된 파일 로그가 유실되지 않습니다.
/// 이미 전역 subscriber가 설치된 경우(테스트 등)에는 조용히 넘어갑니다.
pub fn init_logging(log_dir: &str) -> WorkerGuard {
    let (file_writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, LOG_FILE_PREFIX));

    let stdout_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .with_span_list(false);

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .with_span_list(false)
        .with_thread_names(true)
        .with_ansi(false)
        .with_writer(file_writer);

    let result = tracing_subscriber::registry()
        .with(env_filter())
        .with(stdout_layer)
        .with(file_layer)
        .try_init();

    if let Err(err) = result {
        let already_set = std::error::Error::source(&err)
            .and_then(|source| source.downcast_ref::<SetGlobalDefaultError>())
            .is_some();
        if !already_set {
            // 로깅 없이도 생성기는 계속 실행
            eprintln!("Failed to initialize tracing: {}", err);
        }
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn should_tolerate_repeated_initialization() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().display().to_string();

        // Act
        let first = init_logging(&log_dir);
        let second = init_logging(&log_dir);

        // Assert
        drop(second);
        drop(first);
    }

    #[test]
    fn should_parse_default_filter() {
        // Act
        let filter = EnvFilter::try_new(DEFAULT_FILTER);

        // Assert
        assert!(filter.is_ok());
    }
}
