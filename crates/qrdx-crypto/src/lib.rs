//! qrdx-crypto: password-based authenticated encryption for transfer units
//!
//! ```text
//! password + salt (16 bytes, random per encryption)
//!   └── Argon2id ─→ SymmetricKey (256-bit, zeroized on drop)
//!         └── XChaCha20-Poly1305 (nonce = random 192-bit, embedded in output)
//! ```
//!
//! Every function here is a pure function of its arguments; nothing is
//! cached between calls.

pub mod aead;
pub mod error;
pub mod kdf;

pub use aead::{decrypt, encrypt};
pub use error::CryptoError;
pub use kdf::{derive_key, generate_salt, KdfParams, SymmetricKey};

/// Size of a derived key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of a KDF salt in bytes
pub const SALT_SIZE: usize = 16;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;
