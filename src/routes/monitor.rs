use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;

use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/start", post(start))
        .route("/stop", post(stop))
}

pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    ok(state.monitor().status())
}

pub async fn start(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let status = state.monitor().start().await?;
    Ok(ok(status))
}

/// 未运行时同样返回 200
pub async fn stop(State(state): State<AppState>) -> impl IntoResponse {
    ok(state.monitor().stop().await)
}
