use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::capture::replay::RecordedFrame;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(analyze_frame))
}

/// 对调用方提供的一帧关键点做单帧分析，不影响监控状态
pub async fn analyze_frame(
    State(state): State<AppState>,
    Json(frame): Json<RecordedFrame>,
) -> Result<impl IntoResponse, AppError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(AppError::bad_request(
            "VALIDATION_ERROR",
            "width and height must be positive",
        ));
    }

    let result = state.analyzer().analyze(&frame.faces, frame.dims());
    tracing::debug!(
        face_count = result.face_count,
        peeking = result.peeking,
        reason = result.reason.as_str(),
        "Ad-hoc frame analyzed"
    );
    Ok(ok(result))
}
