//! Countdown/overtime state machine for one tab
//!
//! A [`TimerWidget`] is one tab's view of a logical timer. Every mutating
//! action re-checks the cross-tab lease first; a tab that finds a live
//! foreign lease turns read-only and follows the shared state instead.

use std::{fmt, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{
    clock::{self, Clock},
    lease::LeaseCoordinator,
    pacing::{self, PacingReport},
    store::{self, TimerStore},
};
use crate::{
    config::WidgetConfig,
    error::TimerError,
    placement::{Placement, Point, PointerResult, Size},
    services::{AlarmOutcome, AlertSystem, AudioUnlock},
    state::{TimerState, TimerView, MAX_SECONDS},
    storage::Storage,
};

/// How long the reset control must be held while the timer runs
pub const RESET_HOLD: Duration = Duration::milliseconds(600);

/// Step used by the +/- buttons
pub const ADJUST_STEP_SECONDS: i64 = 60;

const MAX_PENDING_NOTIFICATIONS: usize = 32;

/// User-facing timer phase, derived from the persisted state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Idle,
    Running,
    Paused,
    Finished,
    OvertimeRunning,
}

impl Phase {
    pub fn of(state: &TimerState) -> Self {
        if state.is_running {
            if state.overtime {
                Self::OvertimeRunning
            } else {
                Self::Running
            }
        } else if state.overtime {
            Self::Paused
        } else if state.remaining_seconds <= 0 {
            Self::Finished
        } else if state.remaining_seconds == state.default_seconds {
            Self::Idle
        } else {
            Self::Paused
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Finished => "finished",
            Self::OvertimeRunning => "running in overtime",
        })
    }
}

/// How the reset control was operated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetGesture {
    Tap,
    Hold(Duration),
}

/// Transient guidance shown next to the controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Hint {
    HoldToReset,
}

impl Hint {
    pub fn message(self) -> &'static str {
        match self {
            Self::HoldToReset => "Press and hold reset to restart a running timer",
        }
    }
}

/// Events the host page can react to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimerNotification {
    #[serde(rename_all = "camelCase")]
    Finished {
        key: String,
        session_id: Option<String>,
        at: DateTime<Utc>,
        alarm: Option<AlarmOutcome>,
    },
    #[serde(rename_all = "camelCase")]
    ReadOnly { key: String, owner_id: String },
    Writable { key: String },
}

/// Pointer event kinds forwarded by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

/// Everything a client needs to render the widget
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub tab_id: String,
    pub key: String,
    pub session_id: Option<String>,
    pub phase: Phase,
    pub remaining_seconds: i64,
    pub display: String,
    pub default_seconds: i64,
    pub is_running: bool,
    pub overtime: bool,
    pub deadline_at: Option<DateTime<Utc>>,
    pub read_only: bool,
    pub notice: Option<String>,
    pub hint: Option<String>,
    pub alarm_enabled: bool,
    pub minimized: bool,
    pub view: TimerView,
    pub audio: AudioUnlock,
    pub position: Point,
    pub pacing: PacingReport,
}

/// Shared services a tab is built from
#[derive(Clone)]
pub struct WidgetContext {
    pub storage: Arc<dyn Storage>,
    pub clock: Arc<dyn Clock>,
    pub notifications: broadcast::Sender<TimerNotification>,
}

/// One tab's timer controller
pub struct TimerWidget {
    tab_id: String,
    config: WidgetConfig,
    clock: Arc<dyn Clock>,
    store: TimerStore,
    lease: LeaseCoordinator,
    state: TimerState,
    alerts: AlertSystem,
    placement: Placement,
    read_only_owner: Option<String>,
    hint: Option<Hint>,
    reset_pressed_at: Option<DateTime<Utc>>,
    notifications: broadcast::Sender<TimerNotification>,
    pending: Vec<TimerNotification>,
}

impl TimerWidget {
    /// Mount a widget for a tab. Returns `None` when the host disabled it.
    pub fn activate(
        tab_id: impl Into<String>,
        config: WidgetConfig,
        ctx: &WidgetContext,
        alerts: AlertSystem,
    ) -> Option<Self> {
        if !config.enabled {
            debug!("Timer widget disabled by host configuration");
            return None;
        }
        let tab_id = tab_id.into();
        let key = config.timer_key();
        let store = TimerStore::new(ctx.storage.clone(), key.as_str());
        let target = config.target_seconds();
        let (state, fresh) = store.load_or_init(target);

        let mut widget = Self {
            lease: LeaseCoordinator::new(ctx.storage.clone(), &key, tab_id.as_str()),
            placement: Placement::new(ctx.storage.clone()),
            tab_id,
            config,
            clock: ctx.clock.clone(),
            store,
            state,
            alerts,
            read_only_owner: None,
            hint: None,
            reset_pressed_at: None,
            notifications: ctx.notifications.clone(),
            pending: Vec::new(),
        };

        let now = widget.clock.now();
        let writable = widget.sync_lease(now).is_ok();
        if writable && (store::reconcile(&mut widget.state, target) || fresh) {
            widget.commit(now);
        }
        info!(
            "Activated timer {} for tab {} ({}, {}s)",
            widget.key(),
            widget.tab_id,
            Phase::of(&widget.state),
            widget.state.remaining_seconds
        );

        if fresh && writable && widget.config.autostart {
            if let Err(e) = widget.start() {
                warn!("Autostart of {} failed: {}", widget.key(), e);
            }
        }
        widget.tick();
        Some(widget)
    }

    pub fn tab_id(&self) -> &str {
        &self.tab_id
    }

    pub fn key(&self) -> &str {
        self.store.key()
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        Phase::of(&self.state)
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only_owner.is_some()
    }

    /// Current remaining seconds according to the drift-corrected clock
    pub fn remaining_seconds(&self) -> i64 {
        clock::remaining_seconds(&self.state, self.clock.now())
    }

    /// Start or resume
    pub fn start(&mut self) -> Result<(), TimerError> {
        let now = self.begin_mutation()?;
        if self.state.is_running {
            return Err(self.invalid("start"));
        }
        let mut next = self.state.clone();
        if next.overtime {
            let elapsed = (-next.remaining_seconds).max(0);
            next.overtime_start_at = Some(now - Duration::seconds(elapsed));
            next.deadline_at = None;
        } else {
            if next.remaining_seconds <= 0 {
                next.remaining_seconds = next.default_seconds;
            }
            next.deadline_at = Some(now + Duration::seconds(next.remaining_seconds));
            next.overtime_start_at = None;
        }
        next.is_running = true;

        if let Err(e) = self.lease.acquire(&next, now) {
            let _ = self.sync_lease(now);
            return Err(e);
        }
        self.state = next;
        self.commit(now);
        info!("Timer {} started by tab {}", self.key(), self.tab_id);
        Ok(())
    }

    /// Stop the countdown, keeping the time left
    pub fn pause(&mut self) -> Result<(), TimerError> {
        let now = self.begin_mutation()?;
        if !self.state.is_running {
            return Err(self.invalid("pause"));
        }
        let remaining = clock::remaining_seconds(&self.state, now);
        if !self.state.overtime && remaining == 0 {
            self.finish(now);
            return Ok(());
        }
        self.state.remaining_seconds = remaining;
        self.state.is_running = false;
        self.state.deadline_at = None;
        self.state.overtime_start_at = None;
        self.commit(now);
        self.lease.release();
        info!("Timer {} paused at {}s", self.key(), remaining);
        Ok(())
    }

    /// Add or remove time while stopped
    pub fn adjust(&mut self, delta_seconds: i64) -> Result<(), TimerError> {
        let now = self.begin_mutation()?;
        if self.state.is_running {
            return Err(self.invalid("adjust"));
        }
        let base = if self.state.overtime {
            0
        } else {
            self.state.remaining_seconds.max(0)
        };
        self.state.remaining_seconds = base.saturating_add(delta_seconds).clamp(0, MAX_SECONDS);
        self.state.overtime = false;
        self.state.overtime_start_at = None;
        self.commit(now);
        debug!("Timer {} adjusted to {}s", self.key(), self.state.remaining_seconds);
        Ok(())
    }

    /// Back to the target duration. A running timer needs a hold gesture.
    pub fn reset(&mut self, gesture: ResetGesture) -> Result<(), TimerError> {
        let now = self.begin_mutation()?;
        let was_running = self.state.is_running;
        if was_running {
            let held = matches!(gesture, ResetGesture::Hold(held) if held >= RESET_HOLD);
            if !held {
                self.hint = Some(Hint::HoldToReset);
                return Err(TimerError::HoldRequired);
            }
        }
        self.state.remaining_seconds = self.state.default_seconds;
        self.state.is_running = false;
        self.state.deadline_at = None;
        self.state.overtime = false;
        self.state.overtime_start_at = None;
        self.commit(now);
        if was_running {
            self.lease.release();
        }
        info!("Timer {} reset to {}s", self.key(), self.state.default_seconds);
        Ok(())
    }

    /// The reset control went down
    pub fn press_reset(&mut self) {
        self.reset_pressed_at = Some(self.clock.now());
    }

    /// The reset control came up; the hold length decides what happens
    pub fn release_reset(&mut self) -> Result<(), TimerError> {
        let held = self
            .reset_pressed_at
            .take()
            .map(|pressed| self.clock.now() - pressed)
            .unwrap_or_else(Duration::zero);
        self.reset(ResetGesture::Hold(held))
    }

    /// Add time after the finished notice, optionally restarting
    pub fn extend(&mut self, seconds: i64, autostart: bool) -> Result<(), TimerError> {
        let now = self.begin_mutation()?;
        if self.state.is_running {
            return Err(self.invalid("extend"));
        }
        let base = if self.state.overtime {
            0
        } else {
            self.state.remaining_seconds.max(0)
        };
        self.state.remaining_seconds = base.saturating_add(seconds.max(0)).clamp(0, MAX_SECONDS);
        self.state.overtime = false;
        self.state.overtime_start_at = None;
        self.commit(now);
        info!("Timer {} extended by {}s", self.key(), seconds);
        if autostart {
            self.start()
        } else {
            Ok(())
        }
    }

    /// Keep going past the target, counting up
    pub fn enter_overtime(&mut self) -> Result<(), TimerError> {
        let now = self.begin_mutation()?;
        if self.phase() != Phase::Finished {
            return Err(self.invalid("enter overtime"));
        }
        let mut next = self.state.clone();
        next.overtime = true;
        next.overtime_start_at = Some(now);
        next.remaining_seconds = 0;
        next.deadline_at = None;
        next.is_running = true;

        if let Err(e) = self.lease.acquire(&next, now) {
            let _ = self.sync_lease(now);
            return Err(e);
        }
        self.state = next;
        self.commit(now);
        info!("Timer {} entered overtime", self.key());
        Ok(())
    }

    pub fn set_alarm_enabled(&mut self, enabled: bool) -> Result<(), TimerError> {
        let now = self.begin_mutation()?;
        self.state.alarm_enabled = enabled;
        self.commit(now);
        Ok(())
    }

    pub fn toggle_minimized(&mut self) -> Result<(), TimerError> {
        let now = self.begin_mutation()?;
        self.state.minimized = !self.state.minimized;
        self.commit(now);
        Ok(())
    }

    pub fn set_view(&mut self, view: TimerView) -> Result<(), TimerError> {
        let now = self.begin_mutation()?;
        self.state.view = view;
        self.commit(now);
        Ok(())
    }

    /// Apply new host attributes for the same key
    pub fn reconfigure(&mut self, config: WidgetConfig) -> bool {
        let target = config.target_seconds();
        self.config = config;
        let now = self.clock.now();
        if self.sync_lease(now).is_err() {
            return false;
        }
        let changed = store::reconcile(&mut self.state, target);
        if changed {
            self.commit(now);
            info!("Timer {} retargeted to {}s", self.key(), target);
        }
        changed
    }

    /// Any user interaction; unlocks audio on the first one
    pub fn user_gesture(&mut self) -> AudioUnlock {
        self.alerts.on_user_gesture()
    }

    /// Feed a pointer event to the placement manager. A click toggles the
    /// minimized view.
    pub fn pointer(
        &mut self,
        kind: PointerKind,
        at: Point,
        on_control: bool,
    ) -> Result<PointerResult, TimerError> {
        let result = match kind {
            PointerKind::Down => self.placement.pointer_down(at, on_control),
            PointerKind::Move => self.placement.pointer_move(at),
            PointerKind::Up => self.placement.pointer_up(at),
        };
        if result == PointerResult::Click {
            self.toggle_minimized()?;
        }
        Ok(result)
    }

    pub fn resize(&mut self, viewport: Size, widget: Option<Size>) -> Point {
        self.placement.resize(viewport, widget)
    }

    /// Session to end from the finished prompt
    pub fn end_session_target(&self) -> Result<String, TimerError> {
        if self.phase() != Phase::Finished {
            return Err(self.invalid("end the session"));
        }
        self.config
            .session_id()
            .map(str::to_string)
            .ok_or(TimerError::NoSession)
    }

    /// Poll: re-check the lease, keep the heartbeat, fire the finish
    pub fn tick(&mut self) -> TimerSnapshot {
        let now = self.clock.now();
        if self.sync_lease(now).is_ok() && self.state.is_running {
            if !self.state.overtime && clock::remaining_seconds(&self.state, now) == 0 {
                self.finish(now);
            } else if !self.lease.holds_live_lease(now) {
                debug!("Tab {} resuming lease on {}", self.tab_id, self.key());
                if self.lease.acquire(&self.state, now).is_err() {
                    let _ = self.sync_lease(now);
                }
            } else {
                self.lease.heartbeat(&self.state, now);
            }
        }
        self.snapshot_at(now)
    }

    /// React to another tab writing a slot. Returns whether it concerned us.
    pub fn on_storage_event(&mut self, slot: &str) -> bool {
        let now = self.clock.now();
        if slot == self.placement.slot() {
            self.placement.reload();
            return true;
        }
        if slot != self.lease.slot() && slot != self.store.slot() {
            return false;
        }
        let running_owner = self.state.is_running && self.lease.holds_live_lease(now);
        if self.sync_lease(now).is_ok() && slot == self.store.slot() && !running_owner {
            self.follow_shared_state();
        }
        true
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.snapshot_at(self.clock.now())
    }

    /// Drain notifications not yet delivered to the client
    pub fn take_notifications(&mut self) -> Vec<TimerNotification> {
        std::mem::take(&mut self.pending)
    }

    fn snapshot_at(&self, now: DateTime<Utc>) -> TimerSnapshot {
        let remaining = clock::remaining_seconds(&self.state, now);
        let display = if self.state.overtime {
            format!("+{}", clock::format_clock(remaining.abs()))
        } else {
            clock::format_clock(remaining)
        };
        TimerSnapshot {
            tab_id: self.tab_id.clone(),
            key: self.key().to_string(),
            session_id: self.config.session_id().map(str::to_string),
            phase: self.phase(),
            remaining_seconds: remaining,
            display,
            default_seconds: self.state.default_seconds,
            is_running: self.state.is_running,
            overtime: self.state.overtime,
            deadline_at: self.state.deadline_at,
            read_only: self.is_read_only(),
            notice: self
                .read_only_owner
                .as_ref()
                .map(|_| "This timer is running in another tab; showing it read-only.".to_string()),
            hint: self.hint.map(|hint| hint.message().to_string()),
            alarm_enabled: self.state.alarm_enabled,
            minimized: self.state.minimized,
            view: self.state.view,
            audio: self.alerts.unlock_state(),
            position: self.placement.position(),
            pacing: pacing::estimate(
                self.state.default_seconds,
                remaining,
                self.config.stats.as_ref(),
            ),
        }
    }

    fn begin_mutation(&mut self) -> Result<DateTime<Utc>, TimerError> {
        let now = self.clock.now();
        self.hint = None;
        self.sync_lease(now)?;
        Ok(now)
    }

    /// Re-evaluate read-only mode against the stored lease
    fn sync_lease(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        match self.lease.check(now) {
            Ok(()) => {
                if let Some(owner) = self.read_only_owner.take() {
                    info!("Tab {} regained {} (lease of {} gone)", self.tab_id, self.key(), owner);
                    self.follow_shared_state();
                    self.emit(TimerNotification::Writable {
                        key: self.key().to_string(),
                    });
                }
                Ok(())
            }
            Err(TimerError::ReadOnly { owner }) => {
                if self.read_only_owner.as_deref() != Some(owner.as_str()) {
                    warn!("Tab {} is read-only for {}: owned by {}", self.tab_id, self.key(), owner);
                    self.emit(TimerNotification::ReadOnly {
                        key: self.key().to_string(),
                        owner_id: owner.clone(),
                    });
                }
                self.read_only_owner = Some(owner.clone());
                self.follow_shared_state();
                Err(TimerError::ReadOnly { owner })
            }
            Err(e) => Err(e),
        }
    }

    fn follow_shared_state(&mut self) {
        if let Some(state) = self.store.load(self.config.target_seconds()) {
            self.state = state;
        }
    }

    fn finish(&mut self, now: DateTime<Utc>) {
        self.state.is_running = false;
        self.state.deadline_at = None;
        self.state.overtime_start_at = None;
        self.state.remaining_seconds = 0;
        self.commit(now);
        self.lease.release();

        let alarm = self
            .state
            .alarm_enabled
            .then(|| self.alerts.play_finish_alarm());
        info!("Timer {} finished", self.key());
        self.emit(TimerNotification::Finished {
            key: self.key().to_string(),
            session_id: self.config.session_id().map(str::to_string),
            at: now,
            alarm,
        });
    }

    fn commit(&mut self, now: DateTime<Utc>) {
        self.store.persist(&mut self.state, now);
    }

    fn emit(&mut self, notification: TimerNotification) {
        // Nobody subscribed is fine; the pending queue still has it.
        let _ = self.notifications.send(notification.clone());
        if self.pending.len() >= MAX_PENDING_NOTIFICATIONS {
            self.pending.remove(0);
        }
        self.pending.push(notification);
    }

    fn invalid(&self, action: &'static str) -> TimerError {
        TimerError::InvalidTransition {
            action,
            phase: self.phase(),
        }
    }
}
