pub mod analyze;
pub mod health;
pub mod monitor;
pub mod realtime;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router};

use crate::middleware::request_id;
use crate::response::ErrorBody;
use crate::state::AppState;

/// 单帧关键点 JSON 上限：1 MiB
const MAX_BODY_SIZE: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let monitor_routes = monitor::router().merge(realtime::router());

    let api_routes = Router::new()
        .nest("/monitor", monitor_routes)
        .nest("/analyze", analyze::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .fallback(fallback_404)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}

async fn fallback_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            success: false,
            code: "NOT_FOUND".to_string(),
            message: "Not found".to_string(),
            trace_id: None,
        }),
    )
}
