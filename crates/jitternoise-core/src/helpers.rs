//! Low-level timing primitives shared by the collector and its self test.

// ---------------------------------------------------------------------------
// High-resolution timing
// ---------------------------------------------------------------------------

/// Monotonic timestamp in nanoseconds.
///
/// On Unix this reads `CLOCK_MONOTONIC` directly via `clock_gettime`. On other
/// platforms it falls back to `std::time::Instant` relative to a
/// process-local epoch.
#[cfg(unix)]
pub fn monotonic_ns() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec and CLOCK_MONOTONIC is
    // supported on every Unix we build for.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    if rc != 0 {
        return 0;
    }
    (ts.tv_sec as u64)
        .wrapping_mul(1_000_000_000)
        .wrapping_add(ts.tv_nsec as u64)
}

#[cfg(not(unix))]
pub fn monotonic_ns() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_nanos() as u64
}

// ---------------------------------------------------------------------------
// XOR-fold
// ---------------------------------------------------------------------------

/// XOR-fold all 8 bytes of a `u64` into a single byte.
#[inline]
pub fn xor_fold_u64(v: u64) -> u8 {
    let b = v.to_le_bytes();
    b[0] ^ b[1] ^ b[2] ^ b[3] ^ b[4] ^ b[5] ^ b[6] ^ b[7]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_ns_advances() {
        let t0 = monotonic_ns();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let t1 = monotonic_ns();
        assert!(t1 > t0, "{t1} should be after {t0}");
    }

    #[test]
    fn test_xor_fold() {
        assert_eq!(xor_fold_u64(0), 0);
        assert_eq!(xor_fold_u64(0xFF), 0xFF);
        assert_eq!(xor_fold_u64(0x0101), 0);
        assert_eq!(xor_fold_u64(0x0102_0000_0000_0000), 0x03);
    }
}
