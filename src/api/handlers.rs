//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use super::responses::{
    AdjustRequest, AlarmRequest, ApiResponse, EndSessionResponse, ExtendRequest, HealthResponse,
    OpenTabRequest, PointerRequest, StatusResponse, ViewRequest, ViewportRequest,
};
use crate::{
    error::TimerError,
    placement::{Point, PointerResult, Size},
    state::{app_state::StateError, AppState},
    timer::{ResetGesture, TimerNotification, TimerWidget},
};

fn state_error_status(e: StateError) -> StatusCode {
    match e {
        StateError::TabNotFound(id) => {
            warn!("Request for unknown tab {}", id);
            StatusCode::NOT_FOUND
        }
        StateError::Poisoned(what) => {
            error!("Failed to lock {}", what);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Run a widget action and answer with the resulting snapshot
fn run_action<F>(
    state: &AppState,
    tab_id: &str,
    label: &str,
    action: F,
) -> Result<Json<ApiResponse>, StatusCode>
where
    F: FnOnce(&mut TimerWidget) -> Result<String, TimerError>,
{
    let (result, snapshot) = state
        .with_tab(tab_id, |widget| {
            let result = action(widget);
            (result, widget.snapshot())
        })
        .map_err(state_error_status)?;

    match result {
        Ok(message) => {
            info!("{} on tab {}: {}", label, tab_id, message);
            Ok(Json(ApiResponse::ok(message, snapshot)))
        }
        Err(e) => {
            warn!("{} rejected on tab {}: {}", label, tab_id, e);
            Ok(Json(ApiResponse::rejected(&e, snapshot)))
        }
    }
}

/// Handle POST /tabs - Mount a widget for a tab
pub async fn open_tab_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OpenTabRequest>,
) -> Result<(StatusCode, Json<ApiResponse>), StatusCode> {
    match state.open_tab(request.config, request.tab_id) {
        Ok(Some((tab_id, widget))) => {
            let snapshot = widget
                .lock()
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
                .snapshot();
            info!("Opened tab {} on {}", tab_id, snapshot.key);
            Ok((
                StatusCode::CREATED,
                Json(ApiResponse::ok(format!("Tab {tab_id} opened"), snapshot)),
            ))
        }
        Ok(None) => Ok((StatusCode::OK, Json(ApiResponse::disabled()))),
        Err(e) => Err(state_error_status(e)),
    }
}

/// Handle GET /tabs/:tab_id - Current snapshot
pub async fn tab_status_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    let snapshot = state
        .with_tab(&tab_id, |widget| widget.snapshot())
        .map_err(state_error_status)?;
    Ok(Json(ApiResponse::ok("Current timer".to_string(), snapshot)))
}

/// Handle DELETE /tabs/:tab_id - Unmount a tab
pub async fn close_tab_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
) -> StatusCode {
    match state.close_tab(&tab_id) {
        Ok(true) => StatusCode::NO_CONTENT,
        Ok(false) => StatusCode::NOT_FOUND,
        Err(e) => state_error_status(e),
    }
}

/// Handle PUT /tabs/:tab_id/config - New host attributes
pub async fn reconfigure_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
    Json(request): Json<OpenTabRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    match state.reconfigure_tab(&tab_id, request.config) {
        Ok(Some(widget)) => {
            let snapshot = widget
                .lock()
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
                .snapshot();
            Ok(Json(ApiResponse::ok("Configuration applied".to_string(), snapshot)))
        }
        Ok(None) => Ok(Json(ApiResponse::disabled())),
        Err(e) => Err(state_error_status(e)),
    }
}

/// Handle POST /tabs/:tab_id/start
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    run_action(&state, &tab_id, "start", |w| {
        w.start().map(|()| "Timer started".to_string())
    })
}

/// Handle POST /tabs/:tab_id/pause
pub async fn pause_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    run_action(&state, &tab_id, "pause", |w| {
        w.pause().map(|()| "Timer paused".to_string())
    })
}

/// Handle POST /tabs/:tab_id/reset - A tap on the reset control
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    run_action(&state, &tab_id, "reset", |w| {
        w.reset(ResetGesture::Tap).map(|()| "Timer reset".to_string())
    })
}

/// Handle POST /tabs/:tab_id/reset/press - Reset control pressed down
pub async fn reset_press_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    run_action(&state, &tab_id, "reset press", |w| {
        w.press_reset();
        Ok("Hold to reset".to_string())
    })
}

/// Handle POST /tabs/:tab_id/reset/release - Reset control released
pub async fn reset_release_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    run_action(&state, &tab_id, "reset release", |w| {
        w.release_reset().map(|()| "Timer reset".to_string())
    })
}

/// Handle POST /tabs/:tab_id/adjust
pub async fn adjust_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
    Json(request): Json<AdjustRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    run_action(&state, &tab_id, "adjust", |w| {
        w.adjust(request.delta_seconds)
            .map(|()| format!("Adjusted by {}s", request.delta_seconds))
    })
}

/// Handle POST /tabs/:tab_id/extend - Respond to the finished notice
pub async fn extend_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
    Json(request): Json<ExtendRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    run_action(&state, &tab_id, "extend", |w| {
        w.extend(request.seconds, request.autostart)
            .map(|()| format!("Extended by {}s", request.seconds))
    })
}

/// Handle POST /tabs/:tab_id/overtime
pub async fn overtime_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    run_action(&state, &tab_id, "overtime", |w| {
        w.enter_overtime().map(|()| "Counting overtime".to_string())
    })
}

/// Handle POST /tabs/:tab_id/gesture - Any user interaction
pub async fn gesture_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    run_action(&state, &tab_id, "gesture", |w| {
        Ok(format!("Audio {:?}", w.user_gesture()).to_lowercase())
    })
}

/// Handle POST /tabs/:tab_id/alarm
pub async fn alarm_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
    Json(request): Json<AlarmRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    run_action(&state, &tab_id, "alarm", |w| {
        let message = if request.enabled { "Alarm on" } else { "Alarm off" };
        w.set_alarm_enabled(request.enabled)
            .map(|()| message.to_string())
    })
}

/// Handle POST /tabs/:tab_id/minimize - Toggle the minimized view
pub async fn minimize_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    run_action(&state, &tab_id, "minimize", |w| {
        w.toggle_minimized().map(|()| "View toggled".to_string())
    })
}

/// Handle POST /tabs/:tab_id/view
pub async fn view_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
    Json(request): Json<ViewRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    run_action(&state, &tab_id, "view", |w| {
        w.set_view(request.view)
            .map(|()| format!("View set to {:?}", request.view))
    })
}

/// Handle POST /tabs/:tab_id/pointer - Drag events
pub async fn pointer_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
    Json(request): Json<PointerRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    let at = Point::new(request.x, request.y);
    run_action(&state, &tab_id, "pointer", |w| {
        w.pointer(request.kind, at, request.on_control)
            .map(|result| match result {
                PointerResult::None => "No change".to_string(),
                PointerResult::Click => "Clicked".to_string(),
                PointerResult::Moved(p) => format!("Moved to ({}, {})", p.x, p.y),
                PointerResult::Snapped(p) => format!("Snapped to ({}, {})", p.x, p.y),
            })
    })
}

/// Handle POST /tabs/:tab_id/viewport - Viewport resized
pub async fn viewport_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
    Json(request): Json<ViewportRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    let viewport = Size::new(request.width, request.height);
    let widget = request
        .widget_width
        .zip(request.widget_height)
        .map(|(width, height)| Size::new(width, height));
    run_action(&state, &tab_id, "viewport", |w| {
        let p = w.resize(viewport, widget);
        Ok(format!("Positioned at ({}, {})", p.x, p.y))
    })
}

/// Handle GET /tabs/:tab_id/notifications - Drain pending notices
pub async fn notifications_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
) -> Result<Json<Vec<TimerNotification>>, StatusCode> {
    state
        .with_tab(&tab_id, |widget| widget.take_notifications())
        .map(Json)
        .map_err(state_error_status)
}

/// Handle POST /tabs/:tab_id/end-session - End the linked session
pub async fn end_session_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<String>,
) -> Result<Json<EndSessionResponse>, StatusCode> {
    match state.end_session(&tab_id).await.map_err(state_error_status)? {
        Ok(outcome) => Ok(Json(EndSessionResponse {
            status: "ok".to_string(),
            message: "Session end requested".to_string(),
            outcome: Some(outcome),
        })),
        Err(e) => {
            warn!("End session rejected on tab {}: {}", tab_id, e);
            Ok(Json(EndSessionResponse {
                status: "error".to_string(),
                message: e.to_string(),
                outcome: None,
            }))
        }
    }
}

/// Handle GET /status - Server status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        open_tabs: state.tab_count(),
        uptime: state.get_uptime(),
        default_minutes: state.default_minutes,
        session_site: state
            .session_client
            .as_ref()
            .map(|client| client.base_url().to_string()),
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
