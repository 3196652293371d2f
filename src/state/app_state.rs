//! Server-wide state: every open tab plus the services they share

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Instant,
};

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::WidgetConfig,
    error::TimerError,
    services::{AlertSystem, EndSessionOutcome, SessionClient},
    storage::Storage,
    tasks::tab_driver_task,
    timer::{Clock, TimerNotification, TimerWidget, WidgetContext},
};

/// Capacity of the host-facing notification channel
const NOTIFICATION_CHANNEL_CAPACITY: usize = 100;

pub type SharedWidget = Arc<Mutex<TimerWidget>>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("tab {0} not found")]
    TabNotFound(String),
    #[error("failed to lock {0}")]
    Poisoned(&'static str),
}

/// Main application state that hosts every open tab
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub clock: Arc<dyn Clock>,
    /// Target duration for tabs that do not configure one
    pub default_minutes: u32,
    pub session_client: Option<SessionClient>,
    pub tabs: Mutex<HashMap<String, SharedWidget>>,
    /// Channel the host can subscribe to for finished notices
    pub notification_tx: broadcast::Sender<TimerNotification>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        default_minutes: u32,
        session_client: Option<SessionClient>,
    ) -> Self {
        let (notification_tx, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);
        Self {
            storage,
            clock,
            default_minutes,
            session_client,
            tabs: Mutex::new(HashMap::new()),
            notification_tx,
            start_time: Instant::now(),
        }
    }

    fn context(&self) -> WidgetContext {
        WidgetContext {
            storage: Arc::clone(&self.storage),
            clock: Arc::clone(&self.clock),
            notifications: self.notification_tx.clone(),
        }
    }

    /// Mount a widget for a tab and start driving it.
    ///
    /// A tab may pass back the identifier it was given earlier (a reload
    /// within the same tab) so that it keeps ownership of its own lease.
    /// Returns `Ok(None)` when the host disabled the widget.
    pub fn open_tab(
        &self,
        mut config: WidgetConfig,
        tab_id: Option<String>,
    ) -> Result<Option<(String, SharedWidget)>, StateError> {
        config.target_minutes.get_or_insert(self.default_minutes);
        let tab_id = tab_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let Some(widget) =
            TimerWidget::activate(tab_id.as_str(), config, &self.context(), AlertSystem::headless())
        else {
            return Ok(None);
        };
        let widget = Arc::new(Mutex::new(widget));

        let previous = self
            .tabs
            .lock()
            .map_err(|_| StateError::Poisoned("tab registry"))?
            .insert(tab_id.clone(), Arc::clone(&widget));
        if previous.is_some() {
            info!("Tab {} reopened", tab_id);
        }

        tokio::spawn(tab_driver_task(
            Arc::downgrade(&widget),
            self.storage.subscribe(),
        ));
        Ok(Some((tab_id, widget)))
    }

    pub fn get_tab(&self, tab_id: &str) -> Result<SharedWidget, StateError> {
        self.tabs
            .lock()
            .map_err(|_| StateError::Poisoned("tab registry"))?
            .get(tab_id)
            .cloned()
            .ok_or_else(|| StateError::TabNotFound(tab_id.to_string()))
    }

    /// Run `f` against a tab's widget
    pub fn with_tab<R>(
        &self,
        tab_id: &str,
        f: impl FnOnce(&mut TimerWidget) -> R,
    ) -> Result<R, StateError> {
        let tab = self.get_tab(tab_id)?;
        let mut widget = tab.lock().map_err(|_| StateError::Poisoned("timer widget"))?;
        Ok(f(&mut widget))
    }

    /// Unmount a tab. Its lease, if any, simply goes stale.
    pub fn close_tab(&self, tab_id: &str) -> Result<bool, StateError> {
        let removed = self
            .tabs
            .lock()
            .map_err(|_| StateError::Poisoned("tab registry"))?
            .remove(tab_id)
            .is_some();
        if removed {
            info!("Tab {} closed", tab_id);
        }
        Ok(removed)
    }

    /// Apply new host attributes. A different session selects another key,
    /// so the widget is remounted under the same tab identity.
    pub fn reconfigure_tab(
        &self,
        tab_id: &str,
        mut config: WidgetConfig,
    ) -> Result<Option<SharedWidget>, StateError> {
        config.target_minutes.get_or_insert(self.default_minutes);
        let same_key = self.with_tab(tab_id, |w| {
            if w.key() == config.timer_key() {
                w.reconfigure(config.clone());
                true
            } else {
                false
            }
        })?;
        if same_key {
            return self.get_tab(tab_id).map(Some);
        }
        self.close_tab(tab_id)?;
        Ok(self
            .open_tab(config, Some(tab_id.to_string()))?
            .map(|(_, widget)| widget))
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.lock().map(|tabs| tabs.len()).unwrap_or(0)
    }

    /// End the linked session from the finished prompt
    pub async fn end_session(
        &self,
        tab_id: &str,
    ) -> Result<Result<EndSessionOutcome, TimerError>, StateError> {
        let session_id = match self.with_tab(tab_id, |w| w.end_session_target())? {
            Ok(session_id) => session_id,
            Err(e) => return Ok(Err(e)),
        };
        let outcome = match &self.session_client {
            Some(client) => client.end_session(&session_id).await,
            None => {
                warn!("No session site configured, sending tab {} to the session page", tab_id);
                EndSessionOutcome::Navigate(format!("/training/session/{session_id}/"))
            }
        };
        Ok(Ok(outcome))
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
