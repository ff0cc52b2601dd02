//! Seed pool: a minimal consumer of [`NoiseSource`]s.
//!
//! Architecture:
//! 1. Register noise sources (typically the jitter adapter)
//! 2. Draw the requested size from each source
//! 3. Credit each contribution with the bits its source reported
//! 4. SHA-256 condition all credited contributions into the seed
//! 5. Per-source accounting for health reporting
//!
//! A source that reports 0 bits contributes no bytes. The pool never credits
//! more than the seed length in bits, whatever the sources claim.

use std::sync::{Mutex, PoisonError};

use crate::conditioning::sha256_condition_bytes;
use crate::source::NoiseSource;

/// Runtime state for a registered source.
struct SourceState {
    source: Box<dyn NoiseSource>,
    calls: u64,
    failures: u64,
    total_bits: u64,
    last_bits: u32,
}

impl SourceState {
    fn new(source: Box<dyn NoiseSource>) -> Self {
        Self {
            source,
            calls: 0,
            failures: 0,
            total_bits: 0,
            last_bits: 0,
        }
    }
}

/// Conditioned seed and the entropy credited to it.
#[derive(Debug, Clone)]
pub struct SeedReport {
    /// Conditioned output, exactly the requested length.
    pub bytes: Vec<u8>,
    /// Entropy credited to `bytes`, never above `bytes.len() * 8`.
    pub entropy_bits: u32,
}

/// Thread-safe seed pool over registered noise sources.
pub struct SeedPool {
    sources: Vec<Mutex<SourceState>>,
    state: Mutex<[u8; 32]>,
}

impl SeedPool {
    /// Create an empty pool. Without a seed, the chaining state starts from
    /// OS randomness.
    pub fn new(seed: Option<&[u8]>) -> Self {
        let initial_state = {
            use sha2::{Digest, Sha256};
            let mut h = Sha256::new();
            if let Some(s) = seed {
                h.update(s);
            } else {
                let mut os_random = [0u8; 32];
                if let Err(e) = getrandom::fill(&mut os_random) {
                    log::warn!("OS randomness unavailable for pool state: {e}");
                }
                h.update(os_random);
            }
            let digest: [u8; 32] = h.finalize().into();
            digest
        };

        Self {
            sources: Vec::new(),
            state: Mutex::new(initial_state),
        }
    }

    /// Register a noise source.
    pub fn add_source(&mut self, source: Box<dyn NoiseSource>) {
        self.sources.push(Mutex::new(SourceState::new(source)));
    }

    /// Number of registered sources.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Sum of the sources' ceilings for a full-size read.
    pub fn max_entropy_rate(&self) -> u32 {
        self.sources
            .iter()
            .map(|ss| lock(ss).source.max_entropy_rate())
            .fold(0u32, u32::saturating_add)
    }

    /// Draw `n_bytes` from every source and condition the credited
    /// contributions into an `n_bytes` seed.
    pub fn gather(&self, n_bytes: usize) -> SeedReport {
        let mut material = Vec::new();
        let mut credited: u64 = 0;

        for ss_mutex in &self.sources {
            let mut buf = vec![0u8; n_bytes];
            let mut ss = lock(ss_mutex);
            let bits = ss.source.collect_entropy(&mut buf);
            ss.calls += 1;
            ss.last_bits = bits;
            if bits == 0 {
                ss.failures += 1;
                continue;
            }
            ss.total_bits += u64::from(bits);
            credited += u64::from(bits);
            material.extend_from_slice(&buf);
        }

        let cap = (n_bytes as u64).saturating_mul(8);
        let entropy_bits = u32::try_from(credited.min(cap)).unwrap_or(u32::MAX);

        let mut state = lock(&self.state);
        let bytes = sha256_condition_bytes(&state, &material, n_bytes);
        *state = {
            use sha2::{Digest, Sha256};
            let mut h = Sha256::new();
            h.update(*state);
            h.update(&bytes);
            h.finalize().into()
        };
        drop(state);

        log::debug!(
            "gathered {n_bytes} bytes with {entropy_bits} bits of entropy from {} sources",
            self.sources.len()
        );
        SeedReport {
            bytes,
            entropy_bits,
        }
    }

    /// Health report as structured data.
    pub fn health_report(&self) -> HealthReport {
        let mut sources = Vec::new();
        let mut healthy = 0;

        for ss_mutex in &self.sources {
            let ss = lock(ss_mutex);
            let is_healthy = ss.calls == 0 || ss.last_bits > 0;
            if is_healthy {
                healthy += 1;
            }
            sources.push(SourceHealth {
                name: ss.source.name().to_string(),
                healthy: is_healthy,
                calls: ss.calls,
                failures: ss.failures,
                total_bits: ss.total_bits,
                last_bits: ss.last_bits,
                max_entropy_rate: ss.source.max_entropy_rate(),
            });
        }

        HealthReport {
            healthy,
            total: self.sources.len(),
            sources,
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Overall health report for the seed pool.
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Sources whose last draw was credited (or that were never drawn).
    pub healthy: usize,
    /// Total number of registered sources.
    pub total: usize,
    /// Per-source details.
    pub sources: Vec<SourceHealth>,
}

/// Accounting for a single registered source.
#[derive(Debug, Clone)]
pub struct SourceHealth {
    pub name: String,
    pub healthy: bool,
    /// Draws attempted.
    pub calls: u64,
    /// Draws that were credited 0 bits.
    pub failures: u64,
    /// Bits credited across all draws.
    pub total_bits: u64,
    /// Bits credited to the latest draw.
    pub last_bits: u32,
    /// The source's current ceiling.
    pub max_entropy_rate: u32,
}
