//! XChaCha20-Poly1305 encryption/decryption of opaque buffers
//!
//! Ciphertext format (binary):
//! ```text
//! [24 bytes: random nonce][N bytes: ciphertext][16 bytes: Poly1305 tag]
//! ```
//!
//! The nonce travels with the ciphertext, so decryption needs only the key.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use crate::error::CryptoError;
use crate::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

fn cipher_for(key: &[u8]) -> Result<XChaCha20Poly1305, CryptoError> {
    XChaCha20Poly1305::new_from_slice(key).map_err(|_| {
        CryptoError::InvalidArgument(format!(
            "key must be {KEY_SIZE} bytes, got {}",
            key.len()
        ))
    })
}

/// Encrypt `plaintext` under `key`.
///
/// Returns: `[24-byte nonce][ciphertext][16-byte tag]`
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = cipher_for(key)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    // Only fails for messages beyond the cipher's 2^38-byte limit.
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::InvalidArgument(format!("encryption failed: {e}")))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt the output of [`encrypt`].
///
/// Any failure to authenticate, including input too short to hold a nonce
/// and tag, yields [`CryptoError::Authentication`].
pub fn decrypt(encrypted: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = cipher_for(key)?;

    if encrypted.len() < NONCE_SIZE + TAG_SIZE {
        tracing::debug!(len = encrypted.len(), "ciphertext shorter than nonce + tag");
        return Err(CryptoError::Authentication);
    }

    let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_SIZE);
    let nonce = XNonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::Authentication)
}
