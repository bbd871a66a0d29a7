//! Wire records
//!
//! Every record is a CBOR map (RFC 8949, not msgpack) with fixed keys; byte
//! fields are CBOR byte strings. A record must span its whole input. Transfer units carry the CBOR bytes base64-encoded (standard
//! alphabet, padded).
//!
//! ```text
//! single-part unit:    {"salt": bytes(16), "data": bytes}      data = nonce || ciphertext || tag
//! multi-part unit:     {"v": 2, "p": uint, "t": uint, "d": bytes}
//! reassembled payload: {"d": bytes, "h": bytes(32)}            d = single-part record bytes
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use qrdx_core::{PartInfo, QrdxError, QrdxResult, PART_FORMAT_VERSION};

/// Upper bound on `total_parts`, so a forged envelope can't make
/// reassembly enumerate billions of missing parts.
pub const MAX_TOTAL_PARTS: u32 = u16::MAX as u32;

/// Salt and self-contained ciphertext of one password-sealed blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptedEnvelope {
    #[serde(with = "serde_bytes")]
    pub salt: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

/// One chunk of a multi-part transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartEnvelope {
    #[serde(rename = "v")]
    pub version: u32,
    #[serde(rename = "p")]
    pub part_number: u32,
    #[serde(rename = "t")]
    pub total_parts: u32,
    #[serde(rename = "d", with = "serde_bytes")]
    pub chunk: Vec<u8>,
}

/// What the concatenated chunks of a multi-part transfer decode to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MultiPartPayload {
    /// Bytes of an [`EncryptedEnvelope`]
    #[serde(rename = "d", with = "serde_bytes")]
    pub blob: Vec<u8>,
    /// SHA-256 of the original plaintext
    #[serde(rename = "h", with = "serde_bytes")]
    pub hash: Vec<u8>,
}

impl EncryptedEnvelope {
    pub fn to_bytes(&self) -> QrdxResult<Vec<u8>> {
        to_cbor(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        from_cbor(bytes)
    }
}

impl MultiPartPayload {
    pub fn to_bytes(&self) -> QrdxResult<Vec<u8>> {
        to_cbor(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        from_cbor(bytes)
    }
}

impl PartEnvelope {
    /// A current-version envelope.
    pub fn new(part_number: u32, total_parts: u32, chunk: Vec<u8>) -> Self {
        Self {
            version: PART_FORMAT_VERSION,
            part_number,
            total_parts,
            chunk,
        }
    }

    pub fn info(&self) -> PartInfo {
        PartInfo {
            part_number: self.part_number,
            total_parts: self.total_parts,
        }
    }

    pub fn to_bytes(&self) -> QrdxResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Serialize and base64-encode into a transfer unit.
    pub fn to_unit(&self) -> QrdxResult<String> {
        Ok(encode_unit(&self.to_bytes()?))
    }

    /// Parse a transfer unit, rejecting unknown versions and out-of-range
    /// part numbers. The error is a human-readable reason.
    pub fn from_unit(unit: &str) -> Result<Self, String> {
        let bytes = decode_unit(unit).map_err(|e| format!("invalid base64: {e}"))?;
        let envelope: Self = from_cbor(&bytes)?;

        if envelope.version != PART_FORMAT_VERSION {
            return Err(format!(
                "unsupported envelope version {} (expected {PART_FORMAT_VERSION})",
                envelope.version
            ));
        }
        if envelope.total_parts == 0 || envelope.total_parts > MAX_TOTAL_PARTS {
            return Err(format!(
                "total part count {} outside 1..={MAX_TOTAL_PARTS}",
                envelope.total_parts
            ));
        }
        if envelope.part_number == 0 || envelope.part_number > envelope.total_parts {
            return Err(format!(
                "part number {} outside 1..={}",
                envelope.part_number, envelope.total_parts
            ));
        }
        Ok(envelope)
    }
}

/// Base64-encode bytes into transfer-unit text.
pub fn encode_unit(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode transfer-unit text. Whitespace around the text (trailing
/// newlines from a scanner, say) is ignored.
pub fn decode_unit(unit: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(unit.trim())
}

fn to_cbor<T: Serialize>(value: &T) -> QrdxResult<Vec<u8>> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out)
        .map_err(|e| QrdxError::Other(anyhow::anyhow!("CBOR encode: {e}")))?;
    Ok(out)
}

fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    let mut rest = bytes;
    let value = ciborium::from_reader(&mut rest).map_err(|e| format!("malformed record: {e}"))?;
    if !rest.is_empty() {
        return Err(format!("{} trailing bytes after record", rest.len()));
    }
    Ok(value)
}
