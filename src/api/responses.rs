//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    config::WidgetConfig,
    error::TimerError,
    services::EndSessionOutcome,
    state::TimerView,
    timer::{machine::ADJUST_STEP_SECONDS, PointerKind, TimerSnapshot},
};

/// Response for every tab action
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    /// Machine-readable reason when `status` is `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub timer: Option<TimerSnapshot>,
}

impl ApiResponse {
    pub fn new(status: &str, message: String, timer: Option<TimerSnapshot>) -> Self {
        Self {
            status: status.to_string(),
            message,
            code: None,
            timestamp: Utc::now(),
            timer,
        }
    }

    pub fn ok(message: String, timer: TimerSnapshot) -> Self {
        Self::new("ok", message, Some(timer))
    }

    /// The host disabled the widget; nothing was mounted
    pub fn disabled() -> Self {
        Self::new("disabled", "Timer widget is disabled".to_string(), None)
    }

    /// Action rejected; the snapshot shows the state the user is looking at
    pub fn rejected(error: &TimerError, timer: TimerSnapshot) -> Self {
        Self {
            code: Some(error.code().to_string()),
            ..Self::new("error", error.to_string(), Some(timer))
        }
    }
}

/// Response of the end-session action
#[derive(Debug, Clone, Serialize)]
pub struct EndSessionResponse {
    pub status: String,
    pub message: String,
    pub outcome: Option<EndSessionOutcome>,
}

/// Server status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub open_tabs: usize,
    pub uptime: String,
    pub default_minutes: u32,
    pub session_site: Option<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Body of `POST /tabs`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTabRequest {
    /// Identifier from an earlier mount of the same tab
    #[serde(default)]
    pub tab_id: Option<String>,
    #[serde(flatten)]
    pub config: WidgetConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustRequest {
    #[serde(default = "default_adjust_step")]
    pub delta_seconds: i64,
}

fn default_adjust_step() -> i64 {
    ADJUST_STEP_SECONDS
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendRequest {
    pub seconds: i64,
    #[serde(default)]
    pub autostart: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlarmRequest {
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewRequest {
    pub view: TimerView,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerRequest {
    pub kind: PointerKind,
    pub x: f64,
    pub y: f64,
    /// Pressed on a button or other interactive control
    #[serde(default)]
    pub on_control: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportRequest {
    pub width: f64,
    pub height: f64,
    pub widget_width: Option<f64>,
    pub widget_height: Option<f64>,
}
