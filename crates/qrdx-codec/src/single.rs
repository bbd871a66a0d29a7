//! Single-part codec: raw bytes ⇄ one password-protected transfer unit
//!
//! serialize: salt ← random; key ← Argon2id(password, salt);
//!            data ← encrypt(zstd(raw), key); unit ← base64(cbor{salt, data})
//!
//! Deserialization folds every failure that could mean "wrong password or
//! bad scan" (base64, CBOR structure, authentication, decompression) into
//! [`QrdxError::Decryption`].

use secrecy::SecretString;
use zeroize::Zeroizing;

use qrdx_core::{QrdxError, QrdxResult};
use qrdx_crypto::{decrypt, derive_key, encrypt, generate_salt, SALT_SIZE};

use crate::compress::{compress, decompress};
use crate::envelope::{decode_unit, encode_unit, EncryptedEnvelope};
use crate::{crypto_error, CodecOptions};

/// Encrypt `raw` under `password` into one transfer unit.
pub fn serialize(raw: &[u8], password: &SecretString, opts: &CodecOptions) -> QrdxResult<String> {
    let sealed = seal(raw, password, opts)?;
    Ok(encode_unit(&sealed))
}

/// Recover the bytes sealed in a transfer unit produced by [`serialize`].
pub fn deserialize(unit: &str, password: &SecretString, opts: &CodecOptions) -> QrdxResult<Vec<u8>> {
    let sealed = decode_unit(unit).map_err(|e| {
        tracing::debug!("transfer unit is not base64: {e}");
        QrdxError::Decryption
    })?;
    open(&sealed, password, opts)
}

/// [`serialize`] without the base64 step: the CBOR bytes of an
/// [`EncryptedEnvelope`].
pub(crate) fn seal(raw: &[u8], password: &SecretString, opts: &CodecOptions) -> QrdxResult<Vec<u8>> {
    let salt = generate_salt();
    let key = derive_key(password, &salt, &opts.kdf).map_err(crypto_error)?;

    let compressed = Zeroizing::new(compress(raw, opts.compression_level)?);
    let data = encrypt(&compressed, key.as_bytes()).map_err(crypto_error)?;

    let sealed = EncryptedEnvelope {
        salt: salt.to_vec(),
        data,
    }
    .to_bytes()?;

    tracing::debug!(raw = raw.len(), sealed = sealed.len(), "sealed blob");
    Ok(sealed)
}

/// Inverse of [`seal`].
pub(crate) fn open(sealed: &[u8], password: &SecretString, opts: &CodecOptions) -> QrdxResult<Vec<u8>> {
    let envelope = EncryptedEnvelope::from_bytes(sealed).map_err(|reason| {
        tracing::debug!("sealed blob rejected: {reason}");
        QrdxError::Decryption
    })?;

    let salt: [u8; SALT_SIZE] = envelope.salt.as_slice().try_into().map_err(|_| {
        tracing::debug!(len = envelope.salt.len(), "salt has wrong length");
        QrdxError::Decryption
    })?;

    let key = derive_key(password, &salt, &opts.kdf).map_err(crypto_error)?;

    let compressed = Zeroizing::new(decrypt(&envelope.data, key.as_bytes()).map_err(|e| {
        tracing::warn!("transfer unit failed authentication");
        crypto_error(e)
    })?);

    decompress(&compressed).map_err(|e| {
        tracing::debug!("authenticated payload failed to decompress: {e}");
        QrdxError::Decryption
    })
}
