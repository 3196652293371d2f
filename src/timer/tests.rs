use std::sync::Arc;

use chrono::Duration;
use tokio::sync::broadcast;

use super::*;
use crate::{
    config::WidgetConfig,
    error::TimerError,
    services::{alert::testing::recording_alerts, AlertSystem},
    state::{LeaseRecord, TimerState, MAX_SECONDS},
    storage::{lease_slot, state_slot, MemoryStorage, Storage},
};

struct Harness {
    storage: Arc<MemoryStorage>,
    clock: Arc<ManualClock>,
    ctx: WidgetContext,
}

fn harness() -> Harness {
    let storage = Arc::new(MemoryStorage::new());
    let clock = Arc::new(ManualClock::at_epoch_ms(1_700_000_000_000));
    let (notifications, _) = broadcast::channel(64);
    let ctx = WidgetContext {
        storage: storage.clone(),
        clock: clock.clone(),
        notifications,
    };
    Harness {
        storage,
        clock,
        ctx,
    }
}

fn minutes(target: u32) -> WidgetConfig {
    WidgetConfig {
        target_minutes: Some(target),
        ..WidgetConfig::default()
    }
}

impl Harness {
    fn open(&self, tab: &str, config: WidgetConfig) -> TimerWidget {
        TimerWidget::activate(tab, config, &self.ctx, AlertSystem::headless())
            .expect("widget enabled")
    }

    fn advance_ms(&self, ms: i64) {
        self.clock.advance(Duration::milliseconds(ms));
    }

    fn lease(&self, key: &str) -> Option<LeaseRecord> {
        LeaseRecord::from_stored(&self.storage.get(&lease_slot(key))?)
    }
}

fn finished_count(notifications: &[TimerNotification]) -> usize {
    notifications
        .iter()
        .filter(|n| matches!(n, TimerNotification::Finished { .. }))
        .count()
}

#[test]
fn start_then_pause_keeps_the_target() {
    for target in [1, 25, 90, 240] {
        let h = harness();
        let mut tab = h.open("tab-a", minutes(target));
        let default = i64::from(target) * 60;

        tab.start().unwrap();
        h.advance_ms(300);
        tab.pause().unwrap();

        assert!((tab.state().remaining_seconds - default).abs() <= 1);
        assert!(!tab.state().is_running);
        assert!(tab.state().deadline_at.is_none());
    }
}

#[test]
fn finish_fires_exactly_once() {
    let h = harness();
    let mut events = h.ctx.notifications.subscribe();
    let mut tab = h.open("tab-a", minutes(90));
    tab.start().unwrap();
    assert_eq!(tab.state().deadline_at, Some(h.clock.now() + Duration::seconds(5400)));

    h.advance_ms(5_399_000);
    assert_eq!(tab.tick().remaining_seconds, 1);

    h.advance_ms(61_000);
    let snapshot = tab.tick();
    assert_eq!(snapshot.phase, Phase::Finished);
    assert_eq!(snapshot.remaining_seconds, 0);

    h.advance_ms(10_000);
    tab.tick();
    tab.tick();

    assert_eq!(finished_count(&tab.take_notifications()), 1);
    assert!(matches!(
        events.try_recv(),
        Ok(TimerNotification::Finished { ref key, .. }) if key == "default"
    ));
    assert_eq!(tab.state().remaining_seconds, 0);
    assert!(h.lease("default").is_none());
}

#[test]
fn second_tab_is_read_only_until_lease_goes_stale() {
    let h = harness();
    let mut a = h.open("tab-a", minutes(60));
    a.start().unwrap();

    h.advance_ms(1_000);
    let mut b = h.open("tab-b", minutes(60));
    assert!(b.is_read_only());
    assert!(b.state().is_running, "read-only tab follows the shared state");
    assert!(matches!(b.start(), Err(TimerError::ReadOnly { ref owner }) if owner == "tab-a"));
    assert!(matches!(b.adjust(60), Err(TimerError::ReadOnly { .. })));

    // Tab A is suspended: no heartbeat.
    h.advance_ms(13_999);
    assert!(b.tick().read_only);

    h.advance_ms(1);
    let snapshot = b.tick();
    assert!(!snapshot.read_only);
    assert_eq!(h.lease("default").unwrap().owner_id, "tab-b");

    // A wakes up and finds itself demoted.
    assert!(a.tick().read_only);
    assert!(matches!(a.pause(), Err(TimerError::ReadOnly { ref owner }) if owner == "tab-b"));
}

#[test]
fn heartbeat_keeps_other_tabs_read_only() {
    let h = harness();
    let mut a = h.open("tab-a", minutes(60));
    a.start().unwrap();
    let mut b = h.open("tab-b", minutes(60));

    for _ in 0..12 {
        h.advance_ms(5_000);
        a.tick();
        assert!(b.tick().read_only);
    }
    assert_eq!(h.lease("default").unwrap().owner_id, "tab-a");
}

#[test]
fn pause_releases_lease_for_other_tabs() {
    let h = harness();
    let mut a = h.open("tab-a", minutes(60));
    let mut b = h.open("tab-b", minutes(60));
    a.start().unwrap();
    b.on_storage_event(&lease_slot("default"));
    assert!(b.is_read_only());

    h.advance_ms(30_000);
    a.tick();
    a.pause().unwrap();
    assert!(h.lease("default").is_none());

    assert!(b.on_storage_event(&lease_slot("default")));
    assert!(!b.is_read_only());
    assert_eq!(b.state().remaining_seconds, 3570);
    b.start().unwrap();
    assert_eq!(h.lease("default").unwrap().owner_id, "tab-b");
}

#[test]
fn idle_tabs_pick_up_each_others_changes() {
    let h = harness();
    let mut a = h.open("tab-a", minutes(30));
    let mut b = h.open("tab-b", minutes(30));
    a.adjust(ADJUST).unwrap();
    assert!(b.on_storage_event(&state_slot("default")));
    assert_eq!(b.state().remaining_seconds, 1860);
    assert!(!b.on_storage_event("unrelated"));
}

const ADJUST: i64 = machine::ADJUST_STEP_SECONDS;

#[test]
fn short_tap_while_running_only_hints() {
    let h = harness();
    let mut tab = h.open("tab-a", minutes(10));
    tab.start().unwrap();

    assert_eq!(tab.reset(ResetGesture::Tap), Err(TimerError::HoldRequired));
    let snapshot = tab.snapshot();
    assert!(snapshot.is_running);
    assert!(snapshot.hint.is_some());

    tab.press_reset();
    h.advance_ms(300);
    assert_eq!(tab.release_reset(), Err(TimerError::HoldRequired));
    assert!(tab.state().is_running);

    tab.press_reset();
    h.advance_ms(650);
    tab.release_reset().unwrap();
    assert_eq!(tab.phase(), Phase::Idle);
    assert_eq!(tab.state().remaining_seconds, 600);
    assert!(tab.snapshot().hint.is_none());
    assert!(h.lease("default").is_none());
}

#[test]
fn reset_when_stopped_needs_no_hold() {
    let h = harness();
    let mut tab = h.open("tab-a", minutes(10));
    tab.adjust(-120).unwrap();
    tab.reset(ResetGesture::Tap).unwrap();
    assert_eq!(tab.state().remaining_seconds, 600);
}

#[test]
fn retargeting_a_running_timer_changes_nothing() {
    let h = harness();
    let mut tab = h.open("tab-a", minutes(60));
    tab.start().unwrap();
    h.advance_ms(10_000);
    let before = tab.state().clone();

    assert!(!tab.reconfigure(minutes(30)));
    assert_eq!(tab.state().remaining_seconds, before.remaining_seconds);
    assert_eq!(tab.state().deadline_at, before.deadline_at);
    assert_eq!(tab.state().default_seconds, 3600);

    tab.pause().unwrap();
    assert!(tab.reconfigure(minutes(30)));
    assert_eq!(tab.state().default_seconds, 1800);
    assert_eq!(tab.state().remaining_seconds, 3590);
}

#[test]
fn retargeting_an_untouched_timer_snaps() {
    let h = harness();
    let mut tab = h.open("tab-a", minutes(60));
    assert!(tab.reconfigure(minutes(120)));
    assert_eq!(tab.state().remaining_seconds, 7200);

    // A reopened tab with a new target reconciles on activation too.
    let reopened = h.open("tab-b", minutes(45));
    assert_eq!(reopened.state().remaining_seconds, 2700);
}

#[test]
fn adjust_is_clamped_and_blocked_while_running() {
    let h = harness();
    let mut tab = h.open("tab-a", minutes(1));
    tab.adjust(-600).unwrap();
    assert_eq!(tab.state().remaining_seconds, 0);
    tab.adjust(MAX_SECONDS * 2).unwrap();
    assert_eq!(tab.state().remaining_seconds, MAX_SECONDS);

    tab.start().unwrap();
    assert!(matches!(
        tab.adjust(60),
        Err(TimerError::InvalidTransition { action: "adjust", phase: Phase::Running })
    ));
}

#[test]
fn overtime_counts_up_and_resumes() {
    let h = harness();
    let mut tab = h.open("tab-a", minutes(1));
    tab.start().unwrap();
    h.advance_ms(61_000);
    assert_eq!(tab.tick().phase, Phase::Finished);

    tab.enter_overtime().unwrap();
    assert_eq!(tab.phase(), Phase::OvertimeRunning);
    assert_eq!(h.lease("default").unwrap().owner_id, "tab-a");

    h.advance_ms(90_400);
    let snapshot = tab.tick();
    assert_eq!(snapshot.remaining_seconds, -90);
    assert_eq!(snapshot.display, "+01:30");

    tab.pause().unwrap();
    assert_eq!(tab.state().remaining_seconds, -90);
    assert_eq!(tab.phase(), Phase::Paused);
    assert!(tab.state().overtime);

    h.advance_ms(60_000);
    tab.start().unwrap();
    h.advance_ms(10_000);
    assert_eq!(tab.remaining_seconds(), -100);
    assert_eq!(finished_count(&tab.take_notifications()), 1);
}

#[test]
fn overtime_only_after_finish() {
    let h = harness();
    let mut tab = h.open("tab-a", minutes(5));
    assert!(matches!(
        tab.enter_overtime(),
        Err(TimerError::InvalidTransition { phase: Phase::Idle, .. })
    ));
    assert!(matches!(
        tab.pause(),
        Err(TimerError::InvalidTransition { action: "pause", .. })
    ));
}

#[test]
fn extend_after_finish_restarts() {
    let h = harness();
    let mut tab = h.open("tab-a", minutes(1));
    tab.start().unwrap();
    h.advance_ms(60_000);
    tab.tick();
    assert_eq!(tab.phase(), Phase::Finished);

    tab.extend(300, true).unwrap();
    assert_eq!(tab.phase(), Phase::Running);
    h.advance_ms(1_000);
    assert_eq!(tab.remaining_seconds(), 299);

    assert!(matches!(tab.extend(60, false), Err(TimerError::InvalidTransition { .. })));
}

#[test]
fn finish_plays_alarm_when_enabled() {
    let h = harness();
    let (alerts, recorder) = recording_alerts();
    let mut tab = TimerWidget::activate("tab-a", minutes(1), &h.ctx, alerts).unwrap();
    tab.user_gesture();
    tab.start().unwrap();
    h.advance_ms(60_000);
    tab.tick();

    match &tab.take_notifications()[..] {
        [TimerNotification::Finished { alarm: Some(outcome), .. }] => {
            assert!(outcome.audio_played);
            assert!(outcome.vibrated);
        }
        other => panic!("unexpected notifications {other:?}"),
    }
    assert_eq!(recorder.tones.lock().unwrap().len(), 4);
}

#[test]
fn muted_alarm_still_notifies() {
    let h = harness();
    let (alerts, recorder) = recording_alerts();
    let mut tab = TimerWidget::activate("tab-a", minutes(1), &h.ctx, alerts).unwrap();
    tab.set_alarm_enabled(false).unwrap();
    tab.start().unwrap();
    h.advance_ms(60_000);
    tab.tick();

    assert!(matches!(
        &tab.take_notifications()[..],
        [TimerNotification::Finished { alarm: None, .. }]
    ));
    assert!(recorder.vibrations.lock().unwrap().is_empty());
}

#[test]
fn disabled_widget_is_not_mounted() {
    let h = harness();
    let config = WidgetConfig {
        enabled: false,
        ..WidgetConfig::default()
    };
    assert!(TimerWidget::activate("tab-a", config, &h.ctx, AlertSystem::headless()).is_none());
}

#[test]
fn autostart_only_for_a_fresh_key() {
    let h = harness();
    let config = WidgetConfig {
        autostart: true,
        session_id: Some("8".into()),
        ..minutes(60)
    };
    let mut first = h.open("tab-a", config.clone());
    assert_eq!(first.key(), "session-8");
    assert_eq!(first.phase(), Phase::Running);
    h.advance_ms(5_000);
    first.pause().unwrap();

    let second = h.open("tab-b", config);
    assert_eq!(second.phase(), Phase::Paused);
}

#[test]
fn reloaded_tab_resumes_a_running_timer() {
    let h = harness();
    let mut tab = h.open("tab-a", minutes(60));
    tab.start().unwrap();
    h.advance_ms(120_000);
    drop(tab);

    // Same tab identity after a reload: not locked out by its own lease.
    let mut reloaded = h.open("tab-a", minutes(60));
    assert!(!reloaded.is_read_only());
    assert_eq!(reloaded.tick().remaining_seconds, 3480);
}

#[test]
fn malformed_state_falls_back_to_defaults() {
    let h = harness();
    h.storage.set(&state_slot("default"), "{\"remainingSeconds\":").unwrap();
    let tab = h.open("tab-a", minutes(20));
    assert_eq!(tab.state(), &{
        let mut expected = TimerState::new(1200);
        expected.saved_at = tab.state().saved_at;
        expected
    });
}

#[test]
fn storage_outage_keeps_working_in_memory() {
    let h = harness();
    let mut tab = h.open("tab-a", minutes(10));
    h.storage.set_unavailable(true);

    tab.start().unwrap();
    h.advance_ms(30_000);
    tab.pause().unwrap();
    assert_eq!(tab.state().remaining_seconds, 570);
}

#[test]
fn end_session_needs_a_finished_linked_timer() {
    let h = harness();
    let mut plain = h.open("tab-a", minutes(1));
    assert!(matches!(plain.end_session_target(), Err(TimerError::InvalidTransition { .. })));
    plain.start().unwrap();
    h.advance_ms(60_000);
    plain.tick();
    assert_eq!(plain.end_session_target(), Err(TimerError::NoSession));

    let linked = WidgetConfig {
        session_id: Some("31".into()),
        ..minutes(1)
    };
    let mut tab = h.open("tab-b", linked);
    tab.start().unwrap();
    h.advance_ms(60_000);
    tab.tick();
    assert_eq!(tab.end_session_target().as_deref(), Ok("31"));
}

#[test]
fn snapshot_reports_pacing() {
    let h = harness();
    let config = WidgetConfig {
        stats: Some(SessionStats {
            total: 10,
            done: 5,
            ..SessionStats::default()
        }),
        ..minutes(100)
    };
    let mut tab = h.open("tab-a", config);
    tab.adjust(3400 - 6000).unwrap();

    let pacing = tab.snapshot().pacing;
    assert_eq!(pacing.status, PaceStatus::Ahead);
    assert_eq!(pacing.expected_remaining_seconds, Some(3000));
    assert_eq!(pacing.remaining_items, 5);
}

#[test]
fn click_toggles_minimized() {
    use crate::placement::{Point, PointerResult};

    let h = harness();
    let mut tab = h.open("tab-a", minutes(10));
    let at = Point::new(100.0, 100.0);
    tab.pointer(PointerKind::Down, at, false).unwrap();
    assert_eq!(tab.pointer(PointerKind::Up, at, false).unwrap(), PointerResult::Click);
    assert!(tab.state().minimized);
}

#[test]
fn long_overtime_pauses_within_bounds() {
    let h = harness();
    let mut tab = h.open("tab-a", minutes(1));
    tab.start().unwrap();
    h.advance_ms(61_000);
    tab.tick();
    tab.enter_overtime().unwrap();

    h.advance_ms(5 * 3_600_000);
    assert_eq!(tab.tick().remaining_seconds, -MAX_SECONDS);
    tab.pause().unwrap();
    assert_eq!(tab.state().remaining_seconds, -MAX_SECONDS);

    let stored = h.storage.get(&state_slot("default")).unwrap();
    let reloaded = TimerState::from_stored(&stored, 60).unwrap();
    assert_eq!(reloaded.remaining_seconds, tab.state().remaining_seconds);
}

#[test]
fn huge_adjustments_saturate() {
    let h = harness();
    let mut tab = h.open("tab-a", minutes(30));

    tab.adjust(i64::MAX).unwrap();
    assert_eq!(tab.state().remaining_seconds, MAX_SECONDS);
    tab.adjust(i64::MIN).unwrap();
    assert_eq!(tab.state().remaining_seconds, 0);

    tab.extend(i64::MAX, false).unwrap();
    assert_eq!(tab.state().remaining_seconds, MAX_SECONDS);

    // Still usable afterwards
    tab.adjust(-60).unwrap();
    assert_eq!(tab.state().remaining_seconds, MAX_SECONDS - 60);
}
