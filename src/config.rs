//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::{
    state::timer_state::clamp_default_seconds,
    timer::pacing::SessionStats,
};

/// Target duration used when neither the host nor the CLI names one
pub const DEFAULT_TARGET_MINUTES: u32 = 90;

/// Key shared by every tab that is not linked to a session
pub const DEFAULT_TIMER_KEY: &str = "default";

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "session-timer")]
#[command(about = "A tab-safe countdown/overtime timer service")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Directory holding persisted timer state (in-memory when omitted)
    #[arg(short, long)]
    pub storage_dir: Option<PathBuf>,

    /// Target duration in minutes for tabs that do not configure one
    #[arg(short, long, default_value_t = DEFAULT_TARGET_MINUTES)]
    pub default_minutes: u32,

    /// Base URL of the site that owns linked training sessions
    #[arg(long)]
    pub session_base_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

/// Attributes the host page hands to a widget when it mounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetConfig {
    pub enabled: bool,
    /// Linked session; selects the storage key
    pub session_id: Option<String>,
    pub target_minutes: Option<u32>,
    pub autostart: bool,
    /// Mandatory item progress, used for pacing
    pub stats: Option<SessionStats>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            session_id: None,
            target_minutes: None,
            autostart: false,
            stats: None,
        }
    }
}

impl WidgetConfig {
    /// Session identifier with blank values treated as absent
    pub fn session_id(&self) -> Option<&str> {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Logical timer key: one per linked session, otherwise the shared default
    pub fn timer_key(&self) -> String {
        match self.session_id() {
            Some(id) => format!("session-{id}"),
            None => DEFAULT_TIMER_KEY.to_string(),
        }
    }

    /// Target duration in seconds, clamped to the accepted range
    pub fn target_seconds(&self) -> i64 {
        let minutes = self.target_minutes.unwrap_or(DEFAULT_TARGET_MINUTES);
        clamp_default_seconds(i64::from(minutes) * 60)
    }
}
