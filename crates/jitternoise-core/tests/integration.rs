//! Integration tests for jitternoise-core.
//!
//! These exercise the adapter contract end to end:
//! configuration → lazy construction → concurrent reads → entropy accounting
//! → consumption by the seed pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use rand::Rng;

use jitternoise_core::{
    AdapterConfig, CollectorError, CollectorFactory, JitterAdapter, JitterCollector,
    LifecycleState, NoiseSource, Platform, SecurityStrength, SeedPool, SourceCategory, SourceInfo,
    TimingJitterFactory,
};

// ---------------------------------------------------------------------------
// Instrumented collector
// ---------------------------------------------------------------------------

static TRACKED_INFO: SourceInfo = SourceInfo {
    name: "tracked",
    description: "instrumented collector",
    physics: "deterministic test data",
    category: SourceCategory::Timing,
    platform: Platform::Any,
};

#[derive(Default)]
struct Tracker {
    constructs: AtomicUsize,
    live: AtomicUsize,
    reads: AtomicUsize,
    in_read: AtomicBool,
    overlaps: AtomicUsize,
}

struct TrackedCollector {
    tracker: Arc<Tracker>,
    ready: bool,
    fail_every: usize,
}

impl JitterCollector for TrackedCollector {
    fn read(&mut self, buf: &mut [u8]) -> Result<(), CollectorError> {
        assert!(self.ready, "read on a half-constructed collector");
        if self.tracker.in_read.swap(true, Ordering::SeqCst) {
            self.tracker.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        let n = self.tracker.reads.fetch_add(1, Ordering::SeqCst) + 1;
        std::thread::yield_now();
        buf.fill(n as u8);
        self.tracker.in_read.store(false, Ordering::SeqCst);
        if self.fail_every != 0 && n % self.fail_every == 0 {
            return Err(CollectorError::HealthTest);
        }
        Ok(())
    }
}

struct TrackedFactory {
    tracker: Arc<Tracker>,
    construct_delay: Duration,
    fail_construct: bool,
    fail_every: usize,
}

impl TrackedFactory {
    fn new(tracker: &Arc<Tracker>) -> Self {
        Self {
            tracker: Arc::clone(tracker),
            construct_delay: Duration::ZERO,
            fail_construct: false,
            fail_every: 0,
        }
    }
}

impl CollectorFactory for TrackedFactory {
    type Collector = TrackedCollector;

    fn info(&self) -> &SourceInfo {
        &TRACKED_INFO
    }

    fn construct(&self) -> Result<TrackedCollector, CollectorError> {
        self.tracker.constructs.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.construct_delay);
        if self.fail_construct {
            return Err(CollectorError::TimerUnavailable);
        }
        self.tracker.live.fetch_add(1, Ordering::SeqCst);
        Ok(TrackedCollector {
            tracker: Arc::clone(&self.tracker),
            ready: true,
            fail_every: self.fail_every,
        })
    }
}

fn tracked_adapter(factory: TrackedFactory, entropy_bits: u32) -> JitterAdapter<TrackedFactory> {
    JitterAdapter::new(factory, entropy_bits, SecurityStrength::default())
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_first_use_constructs_exactly_once() {
    let tracker = Arc::new(Tracker::default());
    let mut factory = TrackedFactory::new(&tracker);
    factory.construct_delay = Duration::from_millis(50);
    let adapter = tracked_adapter(factory, 16);

    let total: u32 = std::thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                s.spawn(|| {
                    let mut buf = [0u8; 32];
                    (0..50).map(|_| adapter.collect_entropy(&mut buf)).sum::<u32>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(tracker.constructs.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.live.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.reads.load(Ordering::SeqCst), 16 * 50);
    assert_eq!(tracker.overlaps.load(Ordering::SeqCst), 0, "reads interleaved");
    assert_eq!(total, 16 * 50 * 16);
    assert_eq!(adapter.lifecycle(), LifecycleState::Ready);
}

#[test]
fn concurrent_construction_failure_attempted_once() {
    let tracker = Arc::new(Tracker::default());
    let mut factory = TrackedFactory::new(&tracker);
    factory.construct_delay = Duration::from_millis(20);
    factory.fail_construct = true;
    let adapter = tracked_adapter(factory, 16);

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                let mut buf = [0u8; 32];
                for _ in 0..20 {
                    assert_eq!(adapter.collect_entropy(&mut buf), 0);
                }
            });
        }
    });

    assert_eq!(tracker.constructs.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.reads.load(Ordering::SeqCst), 0);
    assert_eq!(adapter.lifecycle(), LifecycleState::Disabled);
    assert_eq!(adapter.calibration().get(), 0);
    assert_eq!(adapter.max_entropy_rate(), 0);
}

#[test]
fn concurrent_recalibration_is_harmless() {
    let tracker = Arc::new(Tracker::default());
    let adapter = tracked_adapter(TrackedFactory::new(&tracker), 16);

    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 0..1000u32 {
                adapter.calibration().set(8 + i % 300);
            }
        });
        for _ in 0..4 {
            s.spawn(|| {
                let mut buf = [0u8; 16];
                for _ in 0..200 {
                    let bits = adapter.collect_entropy(&mut buf);
                    assert!(bits <= 128);
                    assert!(adapter.max_entropy_rate() <= 256);
                }
            });
        }
    });
}

// ---------------------------------------------------------------------------
// Entropy accounting
// ---------------------------------------------------------------------------

#[test]
fn estimate_never_exceeds_proportional_share_or_buffer_bits() {
    let mut rng = rand::rng();
    let tracker = Arc::new(Tracker::default());
    let adapter = tracked_adapter(TrackedFactory::new(&tracker), 16);

    for _ in 0..500 {
        let calibration: u32 = rng.random_range(1..=1024);
        let len: usize = rng.random_range(1..=512);
        adapter.calibration().set(calibration);

        let mut buf = vec![0u8; len];
        let bits = adapter.collect_entropy(&mut buf);

        let len_bits = len as u64 * 8;
        let share = u64::from(calibration) * len_bits / 256;
        assert!(
            u64::from(bits) <= share.min(len_bits),
            "len={len} calibration={calibration} bits={bits}"
        );
        if len == 32 {
            assert_eq!(bits, calibration.min(256));
        }
    }
}

#[test]
fn transient_failure_then_success() {
    let tracker = Arc::new(Tracker::default());
    let mut factory = TrackedFactory::new(&tracker);
    factory.fail_every = 2;
    let adapter = tracked_adapter(factory, 64);

    let mut buf = [0u8; 16];
    assert_eq!(adapter.collect_entropy(&mut buf), 32);
    assert_eq!(adapter.collect_entropy(&mut buf), 0);
    assert_eq!(adapter.lifecycle(), LifecycleState::Ready);
    assert_eq!(adapter.collect_entropy(&mut buf), 32);
    assert_eq!(adapter.max_entropy_rate(), 64);
    assert_eq!(tracker.constructs.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn adapter_from_config_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("jitternoise.json");
    std::fs::write(&path, r#"{"entropy_bits": 64, "security_strength_bits": 128}"#).unwrap();

    let config = AdapterConfig::load(&path).unwrap();
    let tracker = Arc::new(Tracker::default());
    let adapter = JitterAdapter::from_config(TrackedFactory::new(&tracker), &config).unwrap();

    assert_eq!(adapter.security_strength().bytes(), 16);
    assert_eq!(adapter.max_entropy_rate(), 64);
    let mut buf = [0u8; 16];
    assert_eq!(adapter.collect_entropy(&mut buf), 64);
    let mut half = [0u8; 8];
    assert_eq!(adapter.collect_entropy(&mut half), 32);
}

#[test]
fn missing_config_file_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(AdapterConfig::load(tmp.path().join("absent.json")).is_err());
}

// ---------------------------------------------------------------------------
// Built-in collector and pool
// ---------------------------------------------------------------------------

#[test]
fn builtin_collector_honours_contract() {
    let adapter = JitterAdapter::new(
        TimingJitterFactory::default(),
        16,
        SecurityStrength::default(),
    );
    let mut buf = [0u8; 32];
    let bits = adapter.collect_entropy(&mut buf);
    match adapter.lifecycle() {
        LifecycleState::Ready => assert!(bits == 0 || bits == 16),
        LifecycleState::Disabled => {
            assert_eq!(bits, 0);
            assert_eq!(adapter.max_entropy_rate(), 0);
        }
        LifecycleState::Uninitialized => panic!("first read must leave Uninitialized"),
    }
}

#[test]
fn system_adapter_is_shared() {
    let a = jitternoise_core::system() as *const _;
    let b = jitternoise_core::system() as *const _;
    assert_eq!(a, b);
    assert!(jitternoise_core::max_entropy_rate() <= 256);
}

#[test]
fn pool_consumes_adapter() {
    let tracker = Arc::new(Tracker::default());
    let mut pool = SeedPool::new(Some(b"integration"));
    pool.add_source(Box::new(tracked_adapter(TrackedFactory::new(&tracker), 16)));

    let seed = pool.gather(32);
    assert_eq!(seed.bytes.len(), 32);
    assert_eq!(seed.entropy_bits, 16);
    assert_eq!(pool.max_entropy_rate(), 16);

    let report = pool.health_report();
    assert_eq!(report.sources[0].name, "tracked");
    assert_eq!(report.sources[0].total_bits, 16);
}

#[test]
fn pool_with_disabled_adapter_credits_nothing() {
    let tracker = Arc::new(Tracker::default());
    let mut factory = TrackedFactory::new(&tracker);
    factory.fail_construct = true;
    let adapter: Box<dyn NoiseSource> = Box::new(tracked_adapter(factory, 16));
    let mut pool = SeedPool::new(Some(b"integration"));
    pool.add_source(adapter);

    assert_eq!(pool.max_entropy_rate(), 16);
    assert_eq!(pool.gather(32).entropy_bits, 0);
    assert_eq!(pool.max_entropy_rate(), 0);
    assert_eq!(pool.health_report().sources[0].failures, 1);
}
