// SPDX-License-Identifier: GPL-3.0-only

//! Frame-rate measurement

use std::time::{Duration, Instant};

use crate::constants::timing;

/// Counts events and reports a rate once per window
#[derive(Debug, Clone)]
pub struct FrameRateCounter {
    window: Duration,
    window_start: Option<Instant>,
    count: u32,
    last_rate: Option<f32>,
}

impl Default for FrameRateCounter {
    fn default() -> Self {
        Self::new(timing::FPS_WINDOW)
    }
}

impl FrameRateCounter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            window_start: None,
            count: 0,
            last_rate: None,
        }
    }

    /// Record one event. Returns the new rate when a window closes.
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        let start = *self.window_start.get_or_insert(now);
        self.count += 1;

        let elapsed = now.saturating_duration_since(start);
        if elapsed < self.window {
            return None;
        }

        let rate = self.count as f32 / elapsed.as_secs_f32();
        self.last_rate = Some(rate);
        self.window_start = Some(now);
        self.count = 0;
        Some(rate)
    }

    /// Most recent completed measurement
    pub fn rate(&self) -> Option<f32> {
        self.last_rate
    }

    pub fn reset(&mut self) {
        self.window_start = None;
        self.count = 0;
        self.last_rate = None;
    }
}
