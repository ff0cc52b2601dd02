use std::time::Instant;

use jitternoise_core::quick_quality;
use serde::Serialize;

use super::{CommandResult, GlobalOptions};

#[derive(Serialize)]
struct BenchReport {
    rounds: usize,
    bytes_per_read: usize,
    successes: usize,
    failures: usize,
    credited_bits: u64,
    seconds: f64,
    bytes_per_second: f64,
    shannon_entropy: f64,
    min_entropy: f64,
    compression_ratio: f64,
    grade: char,
    lifecycle: String,
}

pub fn run(opts: &GlobalOptions<'_>, rounds: usize, n_bytes: usize) -> CommandResult {
    if n_bytes == 0 {
        return Err("--bytes must be greater than 0".into());
    }
    let (_, adapter) = super::make_adapter(opts)?;

    let mut collected = Vec::new();
    let mut attempted = 0usize;
    let mut successes = 0usize;
    let mut credited_bits = 0u64;
    let mut buf = vec![0u8; n_bytes];

    let t0 = Instant::now();
    while attempted < rounds {
        // Zero ceiling: calibrated off or disabled, no read can be credited.
        if adapter.max_entropy_rate() == 0 {
            log::debug!("noise source credits nothing, stopping after {attempted} reads");
            break;
        }
        attempted += 1;
        let bits = adapter.collect_entropy(&mut buf);
        if bits > 0 {
            successes += 1;
            credited_bits = credited_bits.saturating_add(u64::from(bits));
            collected.extend_from_slice(&buf);
        }
    }
    let seconds = t0.elapsed().as_secs_f64();

    let quality = quick_quality(&collected);
    let report = BenchReport {
        rounds: attempted,
        bytes_per_read: n_bytes,
        successes,
        failures: attempted - successes,
        credited_bits,
        seconds,
        bytes_per_second: if seconds > 0.0 {
            collected.len() as f64 / seconds
        } else {
            0.0
        },
        shannon_entropy: quality.shannon_entropy,
        min_entropy: quality.min_entropy,
        compression_ratio: quality.compression_ratio,
        grade: quality.grade,
        lifecycle: adapter.lifecycle().to_string(),
    };

    if opts.json {
        return super::print_json(&report);
    }

    println!(
        "{} reads of {} bytes: {} credited, {} uncredited ({})",
        report.rounds, report.bytes_per_read, report.successes, report.failures, report.lifecycle
    );
    println!(
        "Credited entropy:  {} bits over {:.3}s ({:.0} B/s)",
        report.credited_bits, report.seconds, report.bytes_per_second
    );
    println!("\nRaw output quality (diagnostic only, not used for accounting):");
    println!("  Shannon H   {:>6.3} bits/byte", report.shannon_entropy);
    println!("  Min-H∞      {:>6.3} bits/byte", report.min_entropy);
    println!("  Compression {:>6.3}", report.compression_ratio);
    println!("  Grade       {:>6}", report.grade);
    Ok(())
}
