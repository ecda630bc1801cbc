//! Fixed-rate driver for every live room

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::util::time::tick_duration;

use super::registry::RoomRegistry;

pub struct TickScheduler {
    registry: Arc<RoomRegistry>,
    tick_duration: Duration,
}

impl TickScheduler {
    pub fn new(registry: Arc<RoomRegistry>, tick_rate: u32) -> Self {
        Self {
            registry,
            tick_duration: tick_duration(tick_rate),
        }
    }

    /// Tick all rooms forever. Late ticks are skipped, never bunched up.
    pub async fn run(self) {
        info!(
            tick_us = self.tick_duration.as_micros() as u64,
            "Tick scheduler started"
        );

        let mut ticker = interval(self.tick_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.step();
        }
    }

    /// One pass over every room. Returns the number of rooms ticked.
    pub fn step(&self) -> usize {
        let started = Instant::now();
        let rooms = self.registry.tick_rooms();

        let elapsed = started.elapsed();
        if elapsed > self.tick_duration {
            warn!(
                rooms,
                elapsed_us = elapsed.as_micros() as u64,
                "Tick overran its budget"
            );
        }

        rooms
    }
}
