use jitternoise_core::SeedPool;
use serde::Serialize;

use super::{CommandResult, GlobalOptions};

#[derive(Serialize)]
struct SeedOutput {
    bytes: usize,
    entropy_bits: u32,
    max_entropy_rate: u32,
    hex: String,
}

pub fn run(opts: &GlobalOptions<'_>, n_bytes: usize) -> CommandResult {
    if n_bytes == 0 {
        return Err("--bytes must be greater than 0".into());
    }
    let (_, adapter) = super::make_adapter(opts)?;

    let mut pool = SeedPool::new(None);
    pool.add_source(Box::new(adapter));
    let seed = pool.gather(n_bytes);

    let output = SeedOutput {
        bytes: seed.bytes.len(),
        entropy_bits: seed.entropy_bits,
        max_entropy_rate: pool.max_entropy_rate(),
        hex: super::to_hex(&seed.bytes),
    };

    if opts.json {
        return super::print_json(&output);
    }

    println!(
        "Seed: {} bytes, {} bits of entropy credited",
        output.bytes, output.entropy_bits
    );
    println!("{}", output.hex);

    for src in &pool.health_report().sources {
        let ok = if src.healthy { "✓" } else { "✗" };
        println!(
            "  {:<12} {} {:>5} bits (ceiling {})",
            src.name, ok, src.last_bits, src.max_entropy_rate
        );
    }
    Ok(())
}
