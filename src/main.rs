use rockfall_monitor::config::AppConfig;
use rockfall_monitor::domain::risk::{RiskForest, RiskScorer};
use rockfall_monitor::shutdown::shutdown_signal;
use rockfall_monitor::spawn_pipeline;
use rockfall_monitor::state::AppState;
use rockfall_monitor::utils::init_logging;

#[tokio::main]
async fn main() {
    // 1. 환경변수 로드
    dotenvy::dotenv().ok();

    // 2. 설정 로드 (로그 디렉토리가 설정에 포함되므로 로깅보다 먼저)
    let config_result = AppConfig::from_env();

    // 3. 로깅 초기화 (guard는 main이 끝날 때까지 유지)
    let log_dir = match &config_result {
        Ok(config) => config.log_dir.clone(),
        Err(_) => AppConfig::default().log_dir,
    };
    let _guard = init_logging(&log_dir);

    let config = match config_result {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    // 4. 위험도 모델 학습
    let forest = RiskForest::train(config.model_seed);
    tracing::info!(trees = forest.len(), seed = config.model_seed, "Risk model trained");

    // 5. 생성기 실행
    let state = AppState::new(config, RiskScorer::new(forest));
    let handles = spawn_pipeline(&state);
    tracing::info!(
        data_dir = %state.config.data_dir.display(),
        reading_interval_secs = state.config.reading_interval.as_secs(),
        prediction_interval_secs = state.config.prediction_interval.as_secs(),
        "Rockfall monitor started"
    );

    // 6. 종료 시그널 대기
    shutdown_signal().await;
    for handle in &handles {
        handle.abort();
    }
    tracing::info!("Rockfall monitor stopped");
}
