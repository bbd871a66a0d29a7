//! qrdx-codec: the encrypted transfer-unit codec
//!
//! # Pipeline
//! ```text
//! encode: raw ─→ zstd ─→ XChaCha20-Poly1305(Argon2id(password, salt)) ─→ {salt, data} ─→ base64
//!                                                  │ too big for one unit?
//!                                                  └─→ {d: blob, h: sha256(raw)} ─→ N × {v, p, t, d} ─→ base64
//! decode: the mirror image; parts may arrive in any order.
//! ```
//!
//! # Modules
//! - `compress`: zstd before encryption
//! - `integrity`: SHA-256 of the original plaintext
//! - `envelope`: CBOR wire records and base64 transport encoding
//! - `single`: one password-protected transfer unit
//! - `multipart`: chunking a sealed blob across units, and strict reassembly
//! - `planner`: single vs multi-part routing, top-level `encode`/`decode`

pub mod compress;
pub mod envelope;
pub mod integrity;
pub mod multipart;
pub mod planner;
pub mod single;

pub use multipart::{is_multi_part, part_info, plan_chunks, reassemble, split, ChunkPlan};
pub use planner::{decode, encode, Encoded};

use qrdx_core::{QrdxConfig, QrdxError, DEFAULT_COMPRESSION_LEVEL};
use qrdx_crypto::{CryptoError, KdfParams};

/// Tuning knobs shared by every codec operation.
///
/// Both ends of a transfer must agree on `kdf`; `compression_level` only
/// affects the encoding side.
#[derive(Debug, Clone)]
pub struct CodecOptions {
    pub kdf: KdfParams,
    pub compression_level: i32,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            kdf: KdfParams::default(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl CodecOptions {
    pub fn from_config(config: &QrdxConfig) -> Self {
        Self {
            kdf: KdfParams {
                mem_cost_kib: config.kdf.mem_cost_kib,
                time_cost: config.kdf.time_cost,
                parallelism: config.kdf.parallelism,
            },
            compression_level: config.codec.compression_level,
        }
    }
}

pub(crate) fn crypto_error(err: CryptoError) -> QrdxError {
    match err {
        CryptoError::InvalidArgument(msg) => QrdxError::InvalidArgument(msg),
        CryptoError::KeyDerivation(msg) => QrdxError::KeyDerivation(msg),
        CryptoError::Authentication => QrdxError::Decryption,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_config() {
        let mut config = QrdxConfig::default();
        config.kdf.mem_cost_kib = 4096;
        config.kdf.time_cost = 7;
        config.codec.compression_level = 3;

        let opts = CodecOptions::from_config(&config);
        assert_eq!(opts.kdf.mem_cost_kib, 4096);
        assert_eq!(opts.kdf.time_cost, 7);
        assert_eq!(opts.kdf.parallelism, 1);
        assert_eq!(opts.compression_level, 3);
    }

    #[test]
    fn default_options_match_default_config() {
        let from_config = CodecOptions::from_config(&QrdxConfig::default());
        let default = CodecOptions::default();
        assert_eq!(from_config.kdf, default.kdf);
        assert_eq!(from_config.compression_level, default.compression_level);
    }
}
