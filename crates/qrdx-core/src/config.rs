use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{QrdxError, QrdxResult};
use crate::{DEFAULT_COMPRESSION_LEVEL, DEFAULT_MAX_UNIT_BYTES};

/// Top-level configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QrdxConfig {
    pub codec: CodecConfig,
    pub kdf: KdfConfig,
    pub log: LogConfig,
}

/// Transfer-unit sizing and compression
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Capacity of one QR symbol in bytes (default: 2953, version 40 / level L)
    pub max_unit_bytes: usize,
    /// zstd level applied before encryption (default: 16)
    pub compression_level: i32,
}

/// Argon2id cost parameters.
///
/// These are not carried on the wire: the decoding side must use the same
/// values the encoding side used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// Memory cost in KiB (default: 262144 = 256 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 1)
    pub parallelism: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_unit_bytes: DEFAULT_MAX_UNIT_BYTES,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            mem_cost_kib: 262_144,
            time_cost: 3,
            parallelism: 1,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl QrdxConfig {
    /// Load from a TOML file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> QrdxResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| QrdxError::Configuration(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the codec cannot work with.
    pub fn validate(&self) -> QrdxResult<()> {
        if self.codec.max_unit_bytes == 0 {
            return Err(QrdxError::Configuration("codec.max_unit_bytes must be positive".into()));
        }
        if !(1..=22).contains(&self.codec.compression_level) {
            return Err(QrdxError::Configuration(format!(
                "codec.compression_level must be within 1..=22, got {}",
                self.codec.compression_level
            )));
        }
        if self.kdf.time_cost == 0 || self.kdf.parallelism == 0 {
            return Err(QrdxError::Configuration(
                "kdf.time_cost and kdf.parallelism must be positive".into(),
            ));
        }
        if self.kdf.mem_cost_kib < 8 * self.kdf.parallelism {
            return Err(QrdxError::Configuration(format!(
                "kdf.mem_cost_kib must be at least 8 * parallelism ({})",
                8 * self.kdf.parallelism
            )));
        }
        Ok(())
    }
}
