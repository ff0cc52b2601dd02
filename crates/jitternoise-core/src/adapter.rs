//! Jitter noise source adapter.
//!
//! Wraps a [`CollectorFactory`] behind the two [`NoiseSource`] operations:
//!
//! 1. The collector is built lazily, under the guard, on the first
//!    `collect_entropy` call.
//! 2. A failed construction disables the adapter for good and zeroes the
//!    calibration, so `max_entropy_rate` reports 0 from then on.
//! 3. A failed read costs only that call: it returns 0 and the next call
//!    reads again.
//! 4. A successful read of `n` bytes is credited
//!    `calibration * n * 8 / strength_bits` bits (floor), capped at `n * 8`.
//!
//! Every read and the one lifecycle transition happen under a single mutex.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use crate::collector::TimingJitterFactory;
use crate::config::{AdapterConfig, Calibration, SecurityStrength};
use crate::source::{CollectorFactory, JitterCollector, NoiseSource, SourceInfo};

/// Collector lifecycle. Only [`Lifecycle::initialize`] leaves `Uninitialized`.
enum Lifecycle<C> {
    Uninitialized,
    Ready(C),
    Disabled,
}

/// Tag of the adapter's lifecycle, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No construction attempt has been made.
    Uninitialized,
    /// Collector constructed; reads may still fail transiently.
    Ready,
    /// Construction failed; the source is off for the life of the adapter.
    Disabled,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Ready => write!(f, "ready"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

impl<C> Lifecycle<C> {
    fn state(&self) -> LifecycleState {
        match self {
            Self::Uninitialized => LifecycleState::Uninitialized,
            Self::Ready(_) => LifecycleState::Ready,
            Self::Disabled => LifecycleState::Disabled,
        }
    }

    /// Make the single transition out of `Uninitialized`. A no-op in any
    /// other state. Returns the collector when one is usable.
    fn initialize<F>(&mut self, factory: &F, calibration: &Calibration) -> Option<&mut C>
    where
        F: CollectorFactory<Collector = C>,
        C: JitterCollector,
    {
        if matches!(self, Self::Uninitialized) {
            *self = match factory.construct() {
                Ok(collector) => {
                    log::debug!("{}: collector working on current system", factory.info().name);
                    Self::Ready(collector)
                }
                Err(e) => {
                    calibration.set(0);
                    log::info!(
                        "{}: collector unusable on current system: {e}",
                        factory.info().name
                    );
                    Self::Disabled
                }
            };
        }
        match self {
            Self::Ready(collector) => Some(collector),
            _ => None,
        }
    }
}

/// Lazily-initialized, thread-safe jitter noise source.
pub struct JitterAdapter<F: CollectorFactory> {
    factory: F,
    lifecycle: Mutex<Lifecycle<F::Collector>>,
    calibration: Arc<Calibration>,
    strength: SecurityStrength,
}

impl<F: CollectorFactory> JitterAdapter<F> {
    /// Adapter with its own calibration tunable.
    pub fn new(factory: F, entropy_bits: u32, strength: SecurityStrength) -> Self {
        Self::with_calibration(factory, Arc::new(Calibration::new(entropy_bits)), strength)
    }

    /// Adapter sharing a calibration tunable with an external configurator.
    pub fn with_calibration(
        factory: F,
        calibration: Arc<Calibration>,
        strength: SecurityStrength,
    ) -> Self {
        Self {
            factory,
            lifecycle: Mutex::new(Lifecycle::Uninitialized),
            calibration,
            strength,
        }
    }

    /// Build from a validated config.
    pub fn from_config(
        factory: F,
        config: &AdapterConfig,
    ) -> Result<Self, crate::config::ConfigError> {
        Ok(Self::new(
            factory,
            config.entropy_bits,
            config.security_strength()?,
        ))
    }

    /// The calibration tunable. Writes take effect on the next call.
    pub fn calibration(&self) -> &Arc<Calibration> {
        &self.calibration
    }

    /// The factory the collector is (or will be) built from.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn security_strength(&self) -> SecurityStrength {
        self.strength
    }

    /// Current lifecycle tag.
    pub fn lifecycle(&self) -> LifecycleState {
        self.lock().state()
    }

    // Poison is ignored: every transition is a single assignment.
    fn lock(&self) -> MutexGuard<'_, Lifecycle<F::Collector>> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fill `buf` from the collector and return the entropy credited to it.
    ///
    /// Returns 0, leaving `buf` untouched, when the calibration is 0, the
    /// adapter is disabled, or construction fails on this call. Returns 0
    /// with `buf` in an unspecified state when the read itself fails.
    pub fn collect_entropy(&self, buf: &mut [u8]) -> u32 {
        if buf.is_empty() {
            return 0;
        }

        let mut lifecycle = self.lock();

        let entropy_bits = self.calibration.get();
        if entropy_bits == 0 {
            return 0;
        }

        let Some(collector) = lifecycle.initialize(&self.factory, &self.calibration) else {
            return 0;
        };

        if let Err(e) = collector.read(buf) {
            drop(lifecycle);
            log::debug!("{}: read failed: {e}", self.factory.info().name);
            return 0;
        }
        drop(lifecycle);

        let bits = scale_entropy(entropy_bits, buf.len(), self.strength);
        log::debug!(
            "{}: obtained {bits} bits of entropy from {} bytes",
            self.factory.info().name,
            buf.len()
        );
        bits
    }

    /// Upper bound on the entropy credited to a full-size read.
    ///
    /// Reads the calibration without taking the guard. Reports 0 after a
    /// construction failure because that failure zeroes the calibration.
    pub fn max_entropy_rate(&self) -> u32 {
        self.calibration.get().min(self.strength.bits())
    }
}

impl<F: CollectorFactory> NoiseSource for JitterAdapter<F> {
    fn info(&self) -> &SourceInfo {
        self.factory.info()
    }

    fn collect_entropy(&self, buf: &mut [u8]) -> u32 {
        JitterAdapter::collect_entropy(self, buf)
    }

    fn max_entropy_rate(&self) -> u32 {
        JitterAdapter::max_entropy_rate(self)
    }
}

/// Entropy credited to a successful read of `len` bytes.
///
/// Scales `entropy_bits` (defined for a full-size read) by `len` relative to
/// full size, rounding down, then caps at the bits actually produced.
pub fn scale_entropy(entropy_bits: u32, len: usize, strength: SecurityStrength) -> u32 {
    let len_bits = (len as u64).saturating_mul(8);
    let mut bits = u64::from(entropy_bits);
    if len != strength.bytes() {
        bits = bits.saturating_mul(len_bits) / u64::from(strength.bits());
    }
    u32::try_from(bits.min(len_bits)).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// Process-wide instance
// ---------------------------------------------------------------------------

static SYSTEM: OnceLock<JitterAdapter<TimingJitterFactory>> = OnceLock::new();

/// The process-wide adapter over the built-in timing collector.
///
/// Configured from `JITTERNOISE_*` environment variables on first use; a
/// malformed environment falls back to defaults with a warning.
pub fn system() -> &'static JitterAdapter<TimingJitterFactory> {
    SYSTEM.get_or_init(|| {
        let config = AdapterConfig::from_env().unwrap_or_else(|e| {
            log::warn!("ignoring jitternoise environment: {e}");
            AdapterConfig::default()
        });
        let strength = config.security_strength().unwrap_or_default();
        JitterAdapter::new(TimingJitterFactory::default(), config.entropy_bits, strength)
    })
}

/// [`JitterAdapter::collect_entropy`] on the process-wide adapter.
pub fn collect_entropy(buf: &mut [u8]) -> u32 {
    system().collect_entropy(buf)
}

/// [`JitterAdapter::max_entropy_rate`] on the process-wide adapter.
pub fn max_entropy_rate() -> u32 {
    system().max_entropy_rate()
}
