pub mod bench;
pub mod read;
pub mod seed;
pub mod status;

use jitternoise_core::{AdapterConfig, ConfigError, JitterAdapter, TimingJitterFactory};

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Options shared by every subcommand.
pub struct GlobalOptions<'a> {
    pub config_path: Option<&'a str>,
    pub entropy_bits: Option<u32>,
    pub json: bool,
}

/// Resolve the adapter config: file if given, else environment, then the
/// `--entropy-bits` override.
pub fn resolve_config(opts: &GlobalOptions<'_>) -> Result<AdapterConfig, ConfigError> {
    let mut config = match opts.config_path {
        Some(path) => AdapterConfig::load(path)?,
        None => AdapterConfig::from_env()?,
    };
    if let Some(bits) = opts.entropy_bits {
        config.entropy_bits = bits;
    }
    Ok(config)
}

/// Build a fresh adapter over the built-in timing collector.
pub fn make_adapter(
    opts: &GlobalOptions<'_>,
) -> Result<(AdapterConfig, JitterAdapter<TimingJitterFactory>), ConfigError> {
    let config = resolve_config(opts)?;
    log::debug!("adapter config: {config:?}");
    let adapter = JitterAdapter::from_config(TimingJitterFactory::default(), &config)?;
    Ok((config, adapter))
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn print_json(value: &impl serde::Serialize) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
