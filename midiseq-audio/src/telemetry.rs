//! Tick timing for the player thread.
//!
//! Samples go into a fixed ring buffer, so recording never allocates.

use std::time::Duration;

const TICK_BUFFER_SIZE: usize = 256;

/// One reporting window, as produced by [`PlayerTelemetry::take_summary`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetrySummary {
    pub avg_us: u32,
    pub max_us: u32,
    pub p95_us: u32,
    /// Cumulative ticks over budget.
    pub overruns: u64,
    /// Cumulative ticks skipped because the editor held the song.
    pub lock_failures: u64,
}

pub struct PlayerTelemetry {
    tick_durations_us: [u32; TICK_BUFFER_SIZE],
    tick_idx: usize,
    sample_count: usize,
    max_tick_us: u32,
    overrun_count: u64,
    lock_failures: u64,
}

impl Default for PlayerTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerTelemetry {
    pub fn new() -> Self {
        Self {
            tick_durations_us: [0; TICK_BUFFER_SIZE],
            tick_idx: 0,
            sample_count: 0,
            max_tick_us: 0,
            overrun_count: 0,
            lock_failures: 0,
        }
    }

    /// Record how long one tick took against a budget in microseconds.
    #[inline]
    pub fn record(&mut self, duration: Duration, budget_us: u32) {
        let us = duration.as_micros().min(u32::MAX as u128) as u32;

        self.tick_durations_us[self.tick_idx] = us;
        self.tick_idx = (self.tick_idx + 1) % TICK_BUFFER_SIZE;
        if self.sample_count < TICK_BUFFER_SIZE {
            self.sample_count += 1;
        }
        self.max_tick_us = self.max_tick_us.max(us);
        if us > budget_us {
            self.overrun_count += 1;
        }
    }

    #[inline]
    pub fn record_lock_failure(&mut self) {
        self.lock_failures += 1;
    }

    /// Summarize the current window. Resets the max; counters stay cumulative.
    pub fn take_summary(&mut self) -> TelemetrySummary {
        if self.sample_count == 0 {
            return TelemetrySummary {
                lock_failures: self.lock_failures,
                ..TelemetrySummary::default()
            };
        }

        let samples = &self.tick_durations_us[..self.sample_count];
        let sum: u64 = samples.iter().map(|&x| x as u64).sum();
        let avg_us = (sum / self.sample_count as u64) as u32;

        let mut sorted = self.tick_durations_us;
        sorted[..self.sample_count].sort_unstable();
        let p95_idx = (self.sample_count * 95 / 100).max(1) - 1;
        let p95_us = sorted[p95_idx.min(self.sample_count - 1)];

        let max_us = self.max_tick_us;
        self.max_tick_us = 0;

        TelemetrySummary {
            avg_us,
            max_us,
            p95_us,
            overruns: self.overrun_count,
            lock_failures: self.lock_failures,
        }
    }
}
