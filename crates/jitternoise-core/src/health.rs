//! Continuous health tests over raw timing deltas.
//!
//! - Repetition Count Test: catches a stuck source (the same delta over and
//!   over).
//! - Adaptive Proportion Test: catches one delta value dominating a window.
//!
//! Cutoffs assume at least 1 bit of min-entropy per delta at a false-positive
//! rate of about 2^-30.

use crate::source::CollectorError;

/// Consecutive identical deltas that trip the repetition count test.
pub const RCT_CUTOFF: usize = 31;

/// Samples per adaptive proportion window.
pub const APT_WINDOW: usize = 512;

/// Occurrences of the window's first value that trip the adaptive
/// proportion test.
pub const APT_CUTOFF: usize = 325;

/// Health tester state. Feed every delta; reset between independent reads.
#[derive(Debug, Clone, Default)]
pub struct HealthTester {
    last_sample: Option<u64>,
    repetition_count: usize,

    window_count: usize,
    window_value: u64,
    window_hits: usize,
}

impl HealthTester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one delta through both tests.
    pub fn feed(&mut self, sample: u64) -> Result<(), CollectorError> {
        self.repetition_count_test(sample)?;
        self.adaptive_proportion_test(sample)
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn repetition_count_test(&mut self, sample: u64) -> Result<(), CollectorError> {
        if self.last_sample == Some(sample) {
            self.repetition_count += 1;
            if self.repetition_count >= RCT_CUTOFF {
                return Err(CollectorError::HealthTest);
            }
        } else {
            self.last_sample = Some(sample);
            self.repetition_count = 1;
        }
        Ok(())
    }

    fn adaptive_proportion_test(&mut self, sample: u64) -> Result<(), CollectorError> {
        if self.window_count == 0 {
            self.window_value = sample;
            self.window_hits = 1;
            self.window_count = 1;
            return Ok(());
        }

        if sample == self.window_value {
            self.window_hits += 1;
            if self.window_hits >= APT_CUTOFF {
                return Err(CollectorError::HealthTest);
            }
        }

        self.window_count += 1;
        if self.window_count >= APT_WINDOW {
            self.window_count = 0;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repetition_below_cutoff_passes() {
        let mut tester = HealthTester::new();
        for _ in 0..RCT_CUTOFF - 1 {
            assert!(tester.feed(7).is_ok());
        }
    }

    #[test]
    fn test_repetition_at_cutoff_fails() {
        let mut tester = HealthTester::new();
        let results: Vec<_> = (0..RCT_CUTOFF).map(|_| tester.feed(7)).collect();
        assert_eq!(results.last(), Some(&Err(CollectorError::HealthTest)));
    }

    #[test]
    fn test_alternating_values_pass() {
        let mut tester = HealthTester::new();
        for i in 0..10_000u64 {
            assert!(tester.feed(1 + i % 2).is_ok());
        }
    }

    #[test]
    fn test_proportion_half_passes() {
        let mut tester = HealthTester::new();
        for i in 0..APT_WINDOW as u64 {
            let sample = if i % 2 == 0 { 0 } else { i };
            assert!(tester.feed(sample).is_ok());
        }
    }

    #[test]
    fn test_proportion_trips() {
        let mut tester = HealthTester::new();
        let mut failed = false;
        for i in 0..APT_WINDOW as u64 {
            let sample = if i % 4 == 3 { i } else { 0 };
            if tester.feed(sample).is_err() {
                failed = true;
                break;
            }
        }
        assert!(failed, "384 of 512 identical samples should trip");
    }

    #[test]
    fn test_varied_samples_pass() {
        let mut tester = HealthTester::new();
        for i in 0..10_000u64 {
            assert!(tester.feed(i.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 40).is_ok());
        }
    }

    #[test]
    fn test_reset_clears_history() {
        let mut tester = HealthTester::new();
        for _ in 0..RCT_CUTOFF - 1 {
            tester.feed(3).unwrap();
        }
        tester.reset();
        for _ in 0..RCT_CUTOFF - 1 {
            assert!(tester.feed(3).is_ok());
        }
    }
}
