use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use peek_guard::capture::replay::{RecordedLandmarks, ReplaySource};
use peek_guard::capture::FramePipeline;
use peek_guard::config::{CaptureConfig, Config, DetectorConfig, MonitorConfig};
use peek_guard::detector::{FaceLandmarks, FrameAnalyzer};
use peek_guard::monitor::Monitor;
use peek_guard::routes::build_router;
use peek_guard::state::AppState;

use super::fixtures::write_recording;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    pub shutdown_tx: broadcast::Sender<()>,
    _temp_dir: TempDir,
}

/// 快节奏的监控配置，让告警在测试里几百毫秒内触发
pub fn fast_monitor_config() -> MonitorConfig {
    MonitorConfig {
        required_seconds: 0.2,
        target_fps: 50,
        retry_backoff_ms: 5,
        max_consecutive_failures: 3,
        stop_timeout_ms: 2000,
        auto_start: false,
    }
}

pub fn test_config(replay_path: PathBuf, replay_loop: bool) -> Config {
    // 直接构造 Config，避免使用 set_var 造成多线程测试环境变量竞态
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        detector: DetectorConfig::default(),
        monitor: fast_monitor_config(),
        capture: CaptureConfig {
            replay_path: replay_path.to_string_lossy().to_string(),
            replay_loop,
            ..CaptureConfig::default()
        },
    }
}

pub fn build_monitor(config: &Config) -> Monitor {
    let pipeline = FramePipeline::new(
        Arc::new(RecordedLandmarks),
        FrameAnalyzer::with_threshold(config.detector.gaze_threshold),
    );
    Monitor::new(
        config.monitor.clone(),
        config.capture.settings(),
        Arc::new(ReplaySource::new(
            config.capture.replay_path.clone(),
            config.capture.replay_loop,
        )),
        pipeline,
    )
    .expect("build monitor")
}

/// `frames` 为 `None` 时录制文件不存在，启动会失败
pub async fn spawn_with_recording(
    frames: Option<Vec<Vec<FaceLandmarks>>>,
    replay_loop: bool,
) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let replay_path = match frames {
        Some(frames) => write_recording(temp_dir.path(), "session.jsonl", frames),
        None => temp_dir.path().join("missing.jsonl"),
    };

    let config = test_config(replay_path, replay_loop);
    let monitor = Arc::new(build_monitor(&config));
    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let state = AppState::new(monitor, shutdown_tx.clone());
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        shutdown_tx,
        _temp_dir: temp_dir,
    }
}

pub async fn spawn_test_app() -> TestApp {
    spawn_with_recording(Some(vec![super::fixtures::single_face()]), true).await
}
