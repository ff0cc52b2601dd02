use serde::Serialize;

use super::{CommandResult, GlobalOptions};

#[derive(Serialize)]
struct ReadReport {
    bytes: usize,
    entropy_bits: u32,
    lifecycle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
}

pub fn run(opts: &GlobalOptions<'_>, n_bytes: usize, output: Option<&str>) -> CommandResult {
    if n_bytes == 0 {
        return Err("--bytes must be greater than 0".into());
    }
    let (_, adapter) = super::make_adapter(opts)?;

    let mut buf = vec![0u8; n_bytes];
    let bits = adapter.collect_entropy(&mut buf);

    // Uncredited bytes carry no entropy and are never handed out.
    let hex = if bits > 0 && output.is_none() {
        Some(super::to_hex(&buf))
    } else {
        None
    };
    if let Some(path) = output.filter(|_| bits > 0) {
        std::fs::write(path, &buf)?;
    }

    let report = ReadReport {
        bytes: n_bytes,
        entropy_bits: bits,
        lifecycle: adapter.lifecycle().to_string(),
        hex,
        output: output.filter(|_| bits > 0).map(str::to_string),
    };

    if opts.json {
        return super::print_json(&report);
    }

    if bits == 0 {
        println!(
            "No entropy obtained ({} bytes requested, collector {})",
            n_bytes, report.lifecycle
        );
        return Ok(());
    }
    println!("{bits} bits of entropy in {n_bytes} bytes");
    if let Some(hex) = &report.hex {
        println!("{hex}");
    }
    if let Some(path) = &report.output {
        println!("Wrote {n_bytes} bytes to {path}");
    }
    Ok(())
}
