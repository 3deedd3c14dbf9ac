use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use axum::http::{header, HeaderValue};
use peek_guard::capture::replay::{RecordedLandmarks, ReplaySource};
use peek_guard::capture::FramePipeline;
use peek_guard::config::Config;
use peek_guard::detector::FrameAnalyzer;
use peek_guard::logging::{init_tracing, LogConfig};
use peek_guard::monitor::{LogSink, Monitor};
use peek_guard::routes::build_router;
use peek_guard::state::AppState;
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    if let Err(e) = config.validate() {
        eprintln!("FATAL: invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    init_tracing(&LogConfig::from(&config));
    tracing::info!(
        replay_path = %config.capture.replay_path,
        gaze_threshold = config.detector.gaze_threshold,
        required_seconds = config.monitor.required_seconds,
        "Starting peek-guard"
    );

    let pipeline = FramePipeline::new(
        Arc::new(RecordedLandmarks),
        FrameAnalyzer::with_threshold(config.detector.gaze_threshold),
    );
    let source = Arc::new(ReplaySource::new(
        config.capture.replay_path.clone(),
        config.capture.replay_loop,
    ));

    let monitor = match Monitor::new(
        config.monitor.clone(),
        config.capture.settings(),
        source,
        pipeline,
    ) {
        Ok(monitor) => Arc::new(monitor),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create monitor");
            return ExitCode::FAILURE;
        }
    };
    monitor.register_sink(Arc::new(LogSink));

    if config.monitor.auto_start {
        // 启动失败不影响 HTTP 服务，可稍后通过 /api/monitor/start 重试
        if let Err(e) = monitor.start().await {
            tracing::error!(error = %e, "Auto start failed");
        }
    }

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(monitor.clone(), shutdown_tx.clone());

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ));

    let addr = SocketAddr::new(config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind TCP listener");
            monitor.stop().await;
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, "Listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await;

    let status = monitor.stop().await;
    tracing::info!(frames_analyzed = status.frames_analyzed, "Shutdown complete");

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "HTTP server crashed");
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler, ctrl-c only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
