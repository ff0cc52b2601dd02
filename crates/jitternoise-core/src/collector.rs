//! Built-in CPU timing jitter collector.
//!
//! Times a small memory-touching workload over and over. The execution time
//! of each round varies with cache state, pipeline stalls, interrupts and
//! frequency scaling; the deltas between consecutive timestamps are folded
//! into a 64-bit accumulator and every output byte is an XOR-fold of it.
//!
//! Construction runs a power-up self test. A collector is only handed out if
//! the timer advances, never runs backwards, shows real variation, and its
//! deltas pass the continuous health tests.

use crate::health::HealthTester;
use crate::helpers::{monotonic_ns, xor_fold_u64};
use crate::source::{
    CollectorError, CollectorFactory, JitterCollector, Platform, SourceCategory, SourceInfo,
};

/// Deltas sampled by the power-up self test.
const SELFTEST_SAMPLES: usize = 1024;

/// Self test fails when more than this share (out of 16) of deltas are 0.
const MAX_ZERO_DELTAS_16THS: usize = 14;

/// Self test fails when more than this share (out of 16) of consecutive
/// deltas are identical.
const MAX_STUCK_DELTAS_16THS: usize = 14;

static JITTER_INFO: SourceInfo = SourceInfo {
    name: "jitter",
    description: "CPU execution-time jitter of a memory-touching workload",
    physics: "Times a short loop of dependent memory updates with a \
              nanosecond monotonic clock. Each round's duration depends on \
              cache hit/miss patterns, pipeline and branch predictor state, \
              interrupt arrival and DVFS transitions, none of which are \
              observable or controllable from user space. Consecutive deltas \
              are mixed into an accumulator and XOR-folded into output bytes.",
    category: SourceCategory::Timing,
    platform: Platform::Any,
};

/// Tuning for the timing jitter collector.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Timing deltas folded into each output byte.
    ///
    /// **Default:** `64`
    pub oversampling: usize,

    /// Size of the scratch memory the workload walks.
    ///
    /// **Default:** `4096`
    pub memory_bytes: usize,

    /// Memory updates performed per timed round.
    ///
    /// **Default:** `32`
    pub loop_rounds: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            oversampling: 64,
            memory_bytes: 4096,
            loop_rounds: 32,
        }
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds [`TimingJitterCollector`]s.
#[derive(Debug, Clone)]
pub struct TimingJitterFactory {
    config: CollectorConfig,
    timer: fn() -> u64,
}

impl TimingJitterFactory {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            timer: monotonic_ns,
        }
    }

    /// Replace the timestamp source.
    pub fn with_timer(mut self, timer: fn() -> u64) -> Self {
        self.timer = timer;
        self
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }
}

impl Default for TimingJitterFactory {
    fn default() -> Self {
        Self::new(CollectorConfig::default())
    }
}

impl CollectorFactory for TimingJitterFactory {
    type Collector = TimingJitterCollector;

    fn info(&self) -> &SourceInfo {
        &JITTER_INFO
    }

    fn construct(&self) -> Result<TimingJitterCollector, CollectorError> {
        let mut collector = TimingJitterCollector::new(&self.config, self.timer);
        collector.self_test()?;
        Ok(collector)
    }
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// A self-tested timing jitter collector.
pub struct TimingJitterCollector {
    timer: fn() -> u64,
    oversampling: usize,
    loop_rounds: usize,
    memory: Vec<u8>,
    cursor: usize,
    prev: u64,
    acc: u64,
    health: HealthTester,
}

impl TimingJitterCollector {
    fn new(config: &CollectorConfig, timer: fn() -> u64) -> Self {
        Self {
            timer,
            oversampling: config.oversampling.max(1),
            loop_rounds: config.loop_rounds.max(1),
            memory: vec![0u8; config.memory_bytes.max(64)],
            cursor: 0,
            prev: timer(),
            acc: 0,
            health: HealthTester::new(),
        }
    }

    /// Run one timed workload round and return the delta since the previous
    /// round, or `None` if the timer went backwards.
    fn measure(&mut self) -> Option<u64> {
        let len = self.memory.len();
        for _ in 0..self.loop_rounds {
            let slot = &mut self.memory[self.cursor];
            *slot = slot.wrapping_add(1);
            // Stride depends on the byte just written, so the walk is data
            // dependent and cache-unfriendly.
            self.cursor = (self.cursor + 67 + usize::from(*slot)) % len;
        }
        std::hint::black_box(&self.memory);

        let now = (self.timer)();
        let delta = now.checked_sub(self.prev);
        self.prev = now;
        delta
    }

    fn self_test(&mut self) -> Result<(), CollectorError> {
        let mut zeros = 0usize;
        let mut stuck = 0usize;
        let mut last_delta = None;

        for _ in 0..SELFTEST_SAMPLES {
            let delta = self.measure().ok_or(CollectorError::NonMonotonic)?;
            if delta == 0 {
                zeros += 1;
            }
            if last_delta == Some(delta) {
                stuck += 1;
            }
            last_delta = Some(delta);
        }

        if zeros * 16 > SELFTEST_SAMPLES * MAX_ZERO_DELTAS_16THS {
            return Err(CollectorError::TimerUnavailable);
        }
        if stuck * 16 > SELFTEST_SAMPLES * MAX_STUCK_DELTAS_16THS {
            return Err(CollectorError::InsufficientJitter);
        }

        self.health.reset();
        for _ in 0..SELFTEST_SAMPLES {
            let delta = self.measure().ok_or(CollectorError::NonMonotonic)?;
            self.health.feed(delta)?;
        }
        self.health.reset();
        Ok(())
    }
}

impl JitterCollector for TimingJitterCollector {
    fn read(&mut self, buf: &mut [u8]) -> Result<(), CollectorError> {
        self.health.reset();
        for byte in buf.iter_mut() {
            for _ in 0..self.oversampling {
                let delta = self.measure().ok_or(CollectorError::NonMonotonic)?;
                self.health.feed(delta)?;
                self.acc = self.acc.rotate_left(7) ^ delta;
            }
            *byte = xor_fold_u64(self.acc);
        }
        Ok(())
    }
}
