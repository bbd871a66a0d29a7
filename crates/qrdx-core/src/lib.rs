//! qrdx-core: pieces shared by the codec and its front ends
//!
//! - `error`: the caller-facing error taxonomy (`QrdxError`)
//! - `config`: TOML configuration schema (`QrdxConfig`)
//! - `types`: small value types that cross crate boundaries

pub mod config;
pub mod error;
pub mod types;

pub use config::QrdxConfig;
pub use error::{QrdxError, QrdxResult};
pub use types::PartInfo;

/// Default capacity of one transfer unit: a version 40 QR symbol in byte
/// mode at error-correction level L.
pub const DEFAULT_MAX_UNIT_BYTES: usize = 2953;

/// Default zstd level applied before encryption.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 16;

/// Current multi-part envelope format version.
pub const PART_FORMAT_VERSION: u32 = 2;
