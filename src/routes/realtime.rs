use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{extract::State, Router};
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::constants::MAX_SSE_CONNECTIONS;
use crate::response::AppError;
use crate::state::AppState;

static SSE_CONNECTION_COUNT: AtomicUsize = AtomicUsize::new(0);

struct SseGuard;
impl Drop for SseGuard {
    fn drop(&mut self) {
        SSE_CONNECTION_COUNT.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/events", get(alert_events))
}

/// 以 SSE 推送告警事件，事件名 `alert`，数据同 `AlertEvent` 的 JSON
pub async fn alert_events(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let current = SSE_CONNECTION_COUNT.fetch_add(1, Ordering::SeqCst);
    if current >= MAX_SSE_CONNECTIONS {
        SSE_CONNECTION_COUNT.fetch_sub(1, Ordering::SeqCst);
        return Err(AppError::too_many_requests("Too many SSE connections"));
    }
    let guard = SseGuard;

    let mut alerts = state.monitor().subscribe();
    let mut shutdown_rx = state.shutdown_rx();

    let stream = async_stream::stream! {
        let _guard = guard;
        loop {
            tokio::select! {
                received = alerts.recv() => match received {
                    Ok(event) => {
                        if let Ok(json) = serde_json::to_string(&event) {
                            yield Ok(Event::default().event("alert").data(json));
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "SSE subscriber lagged, alert events dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = shutdown_rx.recv() => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}
