use jitternoise_core::NoiseSource;
use serde::Serialize;

use super::{CommandResult, GlobalOptions};

#[derive(Serialize)]
struct StatusReport {
    source: &'static str,
    entropy_bits: u32,
    security_strength_bits: u32,
    full_size_bytes: usize,
    max_entropy_rate: u32,
    lifecycle: String,
    oversampling: usize,
    loop_rounds: usize,
    memory_bytes: usize,
    sample_bits: Option<u32>,
}

pub fn run(opts: &GlobalOptions<'_>, sample: bool) -> CommandResult {
    let (config, adapter) = super::make_adapter(opts)?;
    let strength = adapter.security_strength();

    let sample_bits = sample.then(|| {
        let mut buf = vec![0u8; strength.bytes()];
        adapter.collect_entropy(&mut buf)
    });

    let collector = adapter.factory().config();
    let report = StatusReport {
        source: adapter.name(),
        entropy_bits: config.entropy_bits,
        security_strength_bits: strength.bits(),
        full_size_bytes: strength.bytes(),
        max_entropy_rate: adapter.max_entropy_rate(),
        lifecycle: adapter.lifecycle().to_string(),
        oversampling: collector.oversampling,
        loop_rounds: collector.loop_rounds,
        memory_bytes: collector.memory_bytes,
        sample_bits,
    };

    if opts.json {
        return super::print_json(&report);
    }

    println!("Source:            {}", report.source);
    println!("{}", adapter.info().description);
    println!();
    println!("Calibration:       {} bits per full-size read", report.entropy_bits);
    println!(
        "Security strength: {} bits ({} bytes full size)",
        report.security_strength_bits, report.full_size_bytes
    );
    println!("Max entropy rate:  {} bits", report.max_entropy_rate);
    println!("Lifecycle:         {}", report.lifecycle);
    println!(
        "Collector:         {}x oversampling, {} loop rounds, {} byte workload",
        report.oversampling, report.loop_rounds, report.memory_bytes
    );
    if let Some(bits) = report.sample_bits {
        println!("Sample read:       {bits} bits credited");
    }
    Ok(())
}
