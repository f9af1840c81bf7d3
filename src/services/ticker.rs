//! Background ticker driving the game-cycle transition checks.
//!
//! The ticker itself is stateless: it only invokes `tick_all` on a fixed
//! interval. Overlapping or redundant invocations (a second ticker, manual
//! force calls, cron) are safe because every transition is a conditional
//! update in the state machine.

use crate::services::game_cycle::GameCycleService;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

pub struct Ticker {
    cycle: Arc<GameCycleService>,
    interval: Duration,
}

impl Ticker {
    pub fn new(cycle: Arc<GameCycleService>, interval: Duration) -> Self {
        Self { cycle, interval }
    }

    /// Run forever. A failed pass is logged and the next interval retries;
    /// deadlines derive from absolute timestamps, so missed passes never
    /// accumulate error.
    pub async fn start(&self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            debug!("ticker pass");
            if let Err(e) = self.cycle.tick_all().await {
                error!(error = %e, "ticker pass failed");
            }
        }
    }
}
