//! Noise source contract and the collector capability it wraps.
//!
//! A [`NoiseSource`] is what a consuming DRNG sees: fill a buffer and get back
//! an honest entropy estimate in bits. Underneath, a source drives a
//! [`JitterCollector`] built by a [`CollectorFactory`]. Both collector traits
//! are opaque to the adapter: construction either works or it doesn't, and a
//! read either fills the buffer or fails.

/// Category of noise source based on physical mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceCategory {
    /// CPU/memory timing jitter.
    Timing,
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timing => write!(f, "timing"),
        }
    }
}

/// Target platform for a noise source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Works on any platform.
    Any,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
        }
    }
}

/// Metadata about a noise source.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    /// Unique identifier (e.g. `"jitter"`).
    pub name: &'static str,
    /// One-line human-readable description.
    pub description: &'static str,
    /// Physics explanation of the entropy mechanism.
    pub physics: &'static str,
    /// Source category for classification.
    pub category: SourceCategory,
    /// Target platform.
    pub platform: Platform,
}

/// What a consuming DRNG or entropy pool calls.
///
/// Neither operation ever fails. Absence of entropy is reported as `0` bits
/// and the caller is expected to lean on other sources.
pub trait NoiseSource: Send + Sync {
    /// Source metadata.
    fn info(&self) -> &SourceInfo;

    /// Fill `buf` and return the entropy (in bits) credited to its contents.
    ///
    /// Returns `0` when the source produced nothing; in that case the buffer
    /// carries no entropy and must not be credited.
    fn collect_entropy(&self, buf: &mut [u8]) -> u32;

    /// Static ceiling on the entropy this source ever credits to a
    /// full-size read, in bits.
    fn max_entropy_rate(&self) -> u32;

    /// Convenience: name from info.
    fn name(&self) -> &'static str {
        self.info().name
    }
}

/// Failure reported by a collector.
///
/// The adapter only logs these; it never branches on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorError {
    /// No usable high-resolution timer.
    TimerUnavailable,
    /// The timer went backwards during the self test.
    NonMonotonic,
    /// Timing deltas show too little variation to carry entropy.
    InsufficientJitter,
    /// A continuous health test rejected the noise samples.
    HealthTest,
}

impl std::fmt::Display for CollectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimerUnavailable => write!(f, "no usable high-resolution timer"),
            Self::NonMonotonic => write!(f, "timer is not monotonic"),
            Self::InsufficientJitter => write!(f, "insufficient timing variation"),
            Self::HealthTest => write!(f, "health test failure"),
        }
    }
}

impl std::error::Error for CollectorError {}

/// A constructed jitter collector. Owned exclusively by one adapter.
pub trait JitterCollector: Send {
    /// Fill all of `buf` with noise, or fail without any guarantee about
    /// what `buf` holds.
    fn read(&mut self, buf: &mut [u8]) -> Result<(), CollectorError>;
}

/// Builds a [`JitterCollector`]. Called at most once per adapter.
pub trait CollectorFactory: Send + Sync {
    type Collector: JitterCollector;

    /// Source metadata for collectors built by this factory.
    fn info(&self) -> &SourceInfo;

    /// Construct a collector, running whatever self test it needs.
    fn construct(&self) -> Result<Self::Collector, CollectorError>;
}
