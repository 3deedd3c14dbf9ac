use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.monitor().status();
    Json(serde_json::json!({
        "status": "ok",
        "uptimeSecs": state.uptime_secs(),
        "monitor": {
            "running": status.is_running,
            "alertActive": status.alert_active,
            "lastError": status.last_error,
        }
    }))
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// 上一次运行因采集失败而放弃时视为未就绪，直到重新启动成功
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    let status = state.monitor().status();
    if !status.is_running && status.last_error.is_some() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}
