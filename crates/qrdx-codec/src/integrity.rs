//! SHA-256 integrity hash over the original plaintext
//!
//! Carried alongside the sealed blob in multi-part transfers and checked
//! after reassembly and decryption.

use sha2::{Digest, Sha256};

/// Length of an integrity digest in bytes.
pub const HASH_SIZE: usize = 32;

/// A SHA-256 digest.
pub type Hash = [u8; HASH_SIZE];

/// Hash a byte slice.
pub fn hash_bytes(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Whether `data` hashes to `expected`. A digest of the wrong length never
/// matches.
pub fn verify(data: &[u8], expected: &[u8]) -> bool {
    hash_bytes(data).as_slice() == expected
}
