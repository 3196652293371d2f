//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::{
    adjust_handler, alarm_handler, close_tab_handler, end_session_handler, extend_handler,
    gesture_handler, health_handler, minimize_handler, notifications_handler, open_tab_handler,
    overtime_handler, pause_handler, pointer_handler, reconfigure_handler, reset_handler,
    reset_press_handler, reset_release_handler, start_handler, status_handler,
    tab_status_handler, view_handler, viewport_handler,
};

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tabs", post(open_tab_handler))
        .route(
            "/tabs/:tab_id",
            get(tab_status_handler).delete(close_tab_handler),
        )
        .route("/tabs/:tab_id/config", put(reconfigure_handler))
        .route("/tabs/:tab_id/start", post(start_handler))
        .route("/tabs/:tab_id/pause", post(pause_handler))
        .route("/tabs/:tab_id/reset", post(reset_handler))
        .route("/tabs/:tab_id/reset/press", post(reset_press_handler))
        .route("/tabs/:tab_id/reset/release", post(reset_release_handler))
        .route("/tabs/:tab_id/adjust", post(adjust_handler))
        .route("/tabs/:tab_id/extend", post(extend_handler))
        .route("/tabs/:tab_id/overtime", post(overtime_handler))
        .route("/tabs/:tab_id/gesture", post(gesture_handler))
        .route("/tabs/:tab_id/alarm", post(alarm_handler))
        .route("/tabs/:tab_id/minimize", post(minimize_handler))
        .route("/tabs/:tab_id/view", post(view_handler))
        .route("/tabs/:tab_id/pointer", post(pointer_handler))
        .route("/tabs/:tab_id/viewport", post(viewport_handler))
        .route("/tabs/:tab_id/notifications", get(notifications_handler))
        .route("/tabs/:tab_id/end-session", post(end_session_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
