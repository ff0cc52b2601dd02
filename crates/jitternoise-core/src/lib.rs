//! # jitternoise-core
//!
//! **CPU timing jitter as a noise source, with honest entropy accounting.**
//!
//! `jitternoise-core` exposes a jitter collector to a consuming DRNG through
//! two operations that never fail:
//!
//! - `collect_entropy(buf)`: fill `buf` and return the entropy credited to it
//!   in bits (0 means "nothing usable this time").
//! - `max_entropy_rate()`: the ceiling for a full-size read.
//!
//! ## Quick Start
//!
//! ```no_run
//! let mut buf = [0u8; 32];
//! let bits = jitternoise_core::collect_entropy(&mut buf);
//! assert!(bits <= jitternoise_core::max_entropy_rate());
//! ```
//!
//! ## Architecture
//!
//! Collector factory → Adapter (lazy construction, single guard) → Consumer
//!
//! The collector is built on first use and kept for the life of the adapter.
//! If it cannot be built, the adapter disables itself permanently and zeroes
//! its calibration. Individual read failures are transient. A full-size read
//! (the consumer's security strength in bytes) is credited the calibration
//! value; other sizes are scaled proportionally, rounding down, and capped at
//! the number of bits produced.

pub mod adapter;
pub mod collector;
pub mod conditioning;
pub mod config;
pub mod health;
pub mod helpers;
pub mod pool;
pub mod source;

pub use adapter::{
    JitterAdapter, LifecycleState, collect_entropy, max_entropy_rate, scale_entropy, system,
};
pub use collector::{CollectorConfig, TimingJitterCollector, TimingJitterFactory};
pub use conditioning::{QualityReport, quick_min_entropy, quick_quality, quick_shannon};
pub use config::{
    AdapterConfig, Calibration, ConfigError, DEFAULT_ENTROPY_BITS,
    DEFAULT_SECURITY_STRENGTH_BITS, SecurityStrength,
};
pub use pool::{HealthReport, SeedPool, SeedReport, SourceHealth};
pub use source::{
    CollectorError, CollectorFactory, JitterCollector, NoiseSource, Platform, SourceCategory,
    SourceInfo,
};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
