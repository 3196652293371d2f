//! Per-tab poll loop

use std::sync::{Mutex, Weak};

use tokio::{
    sync::broadcast::{error::RecvError, Receiver},
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, error};

use crate::{
    storage::StorageEvent,
    timer::{TimerWidget, POLL_INTERVAL},
};

/// Drive one tab: poll on a short interval and re-check immediately when
/// another tab writes shared storage. Exits once the tab is closed.
///
/// A backgrounded runtime may skip ticks; nothing here counts them, the
/// widget recomputes from the stored deadline on every poll.
pub async fn tab_driver_task(tab: Weak<Mutex<TimerWidget>>, mut events: Receiver<StorageEvent>) {
    let mut ticker = interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !with_widget(&tab, |widget| {
                    widget.tick();
                }) {
                    break;
                }
            }

            event = events.recv() => {
                let alive = match event {
                    Ok(event) => with_widget(&tab, |widget| {
                        widget.on_storage_event(&event.slot);
                    }),
                    Err(RecvError::Lagged(missed)) => {
                        debug!("Tab driver missed {} storage events, re-checking", missed);
                        with_widget(&tab, |widget| {
                            widget.tick();
                        })
                    }
                    Err(RecvError::Closed) => false,
                };
                if !alive {
                    break;
                }
            }
        }
    }

    debug!("Tab driver stopped");
}

/// Returns `false` when the tab is gone
fn with_widget(tab: &Weak<Mutex<TimerWidget>>, f: impl FnOnce(&mut TimerWidget)) -> bool {
    let Some(tab) = tab.upgrade() else {
        return false;
    };
    let alive = match tab.lock() {
        Ok(mut widget) => {
            f(&mut widget);
            true
        }
        Err(e) => {
            error!("Timer widget lock poisoned: {}", e);
            false
        }
    };
    alive
}
