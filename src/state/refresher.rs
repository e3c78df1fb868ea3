use crate::state::messages::UiEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};

/// Polls for new data. Each tick asks the main loop to start a refresh
/// cycle; the main loop owns the stores, so it builds the fetch plan.
pub struct PeriodicRefresher {
    ui_events: mpsc::Sender<UiEvent>,
    every: Duration,
}

impl PeriodicRefresher {
    pub fn new(ui_events: mpsc::Sender<UiEvent>, every: Duration) -> Self {
        Self { ui_events, every }
    }

    pub async fn run(self) {
        let mut ticks = interval(self.every);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the immediate first tick so startup loading isn't double-triggered.
        ticks.tick().await;

        loop {
            ticks.tick().await;
            if self.ui_events.send(UiEvent::RefreshDue).await.is_err() {
                break;
            }
        }
    }
}
