//! Capacity planning: one unit when it fits, multi-part when it doesn't
//!
//! The file is sealed once; if the single-part unit is not strictly
//! shorter than the budget, that same sealed blob is split into parts.

use secrecy::SecretString;

use qrdx_core::{QrdxError, QrdxResult};

use crate::envelope::encode_unit;
use crate::multipart::{is_multi_part, reassemble, split_sealed};
use crate::{single, CodecOptions};

/// Result of [`encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    Single(String),
    Multi(Vec<String>),
}

impl Encoded {
    /// The transfer units, in part order.
    pub fn units(&self) -> &[String] {
        match self {
            Encoded::Single(unit) => std::slice::from_ref(unit),
            Encoded::Multi(units) => units,
        }
    }

    pub fn into_units(self) -> Vec<String> {
        match self {
            Encoded::Single(unit) => vec![unit],
            Encoded::Multi(units) => units,
        }
    }

    pub fn len(&self) -> usize {
        self.units().len()
    }

    pub fn is_empty(&self) -> bool {
        self.units().is_empty()
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, Encoded::Multi(_))
    }
}

/// Encode `raw` into as few transfer units as `max_unit_bytes` allows.
pub fn encode(
    raw: &[u8],
    password: &SecretString,
    max_unit_bytes: usize,
    opts: &CodecOptions,
) -> QrdxResult<Encoded> {
    let sealed = single::seal(raw, password, opts)?;
    let unit = encode_unit(&sealed);

    if unit.len() < max_unit_bytes {
        tracing::info!(len = unit.len(), max_unit_bytes, "fits in a single unit");
        return Ok(Encoded::Single(unit));
    }

    tracing::info!(
        len = unit.len(),
        max_unit_bytes,
        "single unit too large, switching to multi-part"
    );
    split_sealed(raw, sealed, max_unit_bytes).map(Encoded::Multi)
}

/// Decode one or more transfer units back into the original bytes.
///
/// A lone unit that is not a part envelope goes through the single-part
/// codec; anything else is reassembled.
pub fn decode<S>(units: &[S], password: &SecretString, opts: &CodecOptions) -> QrdxResult<Vec<u8>>
where
    S: AsRef<str> + Sync,
{
    match units {
        [] => Err(QrdxError::InvalidArgument("no transfer units supplied".into())),
        [unit] if !is_multi_part(unit.as_ref()) => single::deserialize(unit.as_ref(), password, opts),
        _ => reassemble(units, password, opts),
    }
}
