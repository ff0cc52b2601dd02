//! Adapter configuration: the calibration tunable and the consuming DRNG's
//! declared security strength.
//!
//! The calibration value is the number of entropy bits credited to one
//! full-size read, where full size is the security strength in bytes. It is
//! deliberately not range-checked here: values above the security strength
//! are accepted and capped when entropy is computed.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Security strength of the consuming DRNG, in bits.
pub const DEFAULT_SECURITY_STRENGTH_BITS: u32 = 256;

/// Calibration default: a 16th of the security strength.
pub const DEFAULT_ENTROPY_BITS: u32 = DEFAULT_SECURITY_STRENGTH_BITS >> 4;

/// Environment variable overriding the calibration value.
pub const ENV_ENTROPY_BITS: &str = "JITTERNOISE_ENTROPY_BITS";

/// Environment variable overriding the security strength.
pub const ENV_SECURITY_STRENGTH_BITS: &str = "JITTERNOISE_SECURITY_STRENGTH_BITS";

/// Configuration loading or validation failure.
#[derive(Debug)]
pub enum ConfigError {
    /// Security strength is zero or not a whole number of bytes.
    InvalidSecurityStrength(u32),
    /// An environment variable did not parse as an unsigned integer.
    InvalidEnv { var: &'static str, value: String },
    /// Reading a config file failed.
    Io(std::io::Error),
    /// A config file was not valid JSON for [`AdapterConfig`].
    Parse(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSecurityStrength(bits) => {
                write!(f, "security strength must be a non-zero multiple of 8 bits, got {bits}")
            }
            Self::InvalidEnv { var, value } => {
                write!(f, "{var}={value:?} is not an unsigned integer")
            }
            Self::Io(e) => write!(f, "failed to read config: {e}"),
            Self::Parse(e) => write!(f, "failed to parse config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// SecurityStrength
// ---------------------------------------------------------------------------

/// Declared security strength of the consuming DRNG.
///
/// Defines "full size": a read of [`bytes()`](Self::bytes) bytes is credited
/// exactly the calibration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityStrength {
    bits: u32,
}

impl SecurityStrength {
    pub fn new(bits: u32) -> Result<Self, ConfigError> {
        if bits == 0 || bits % 8 != 0 {
            return Err(ConfigError::InvalidSecurityStrength(bits));
        }
        Ok(Self { bits })
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn bytes(&self) -> usize {
        (self.bits / 8) as usize
    }
}

impl Default for SecurityStrength {
    fn default() -> Self {
        Self {
            bits: DEFAULT_SECURITY_STRENGTH_BITS,
        }
    }
}

// ---------------------------------------------------------------------------
// Calibration
// ---------------------------------------------------------------------------

/// The process-wide calibration tunable.
///
/// Updated externally at any time and read without ordering guarantees. A
/// stale read only ever changes which conservative estimate is reported.
#[derive(Debug)]
pub struct Calibration {
    bits: AtomicU32,
}

impl Calibration {
    pub fn new(bits: u32) -> Self {
        Self {
            bits: AtomicU32::new(bits),
        }
    }

    /// Entropy bits credited to a full-size read.
    pub fn get(&self) -> u32 {
        self.bits.load(Ordering::Relaxed)
    }

    /// Set the entropy bits credited to a full-size read.
    pub fn set(&self, bits: u32) {
        self.bits.store(bits, Ordering::Relaxed);
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new(DEFAULT_ENTROPY_BITS)
    }
}

// ---------------------------------------------------------------------------
// AdapterConfig
// ---------------------------------------------------------------------------

/// Serializable adapter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Entropy bits credited to a full-size read.
    ///
    /// **Default:** `16` (a 16th of 256)
    pub entropy_bits: u32,

    /// Security strength of the consuming DRNG in bits.
    ///
    /// **Default:** `256`
    pub security_strength_bits: u32,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            entropy_bits: DEFAULT_ENTROPY_BITS,
            security_strength_bits: DEFAULT_SECURITY_STRENGTH_BITS,
        }
    }
}

impl AdapterConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Defaults overridden by `JITTERNOISE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(bits) = parse_var(&lookup, ENV_ENTROPY_BITS)? {
            config.entropy_bits = bits;
        }
        if let Some(bits) = parse_var(&lookup, ENV_SECURITY_STRENGTH_BITS)? {
            config.security_strength_bits = bits;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check the security strength. The calibration value is never rejected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.security_strength().map(|_| ())
    }

    pub fn security_strength(&self) -> Result<SecurityStrength, ConfigError> {
        SecurityStrength::new(self.security_strength_bits)
    }
}

fn parse_var(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u32>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
    }
}
