use thiserror::Error;

pub type QrdxResult<T> = Result<T, QrdxError>;

#[derive(Debug, Error)]
pub enum QrdxError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// Wrong password, or a malformed/corrupted transfer unit. The two are
    /// indistinguishable.
    #[error("decryption failed: wrong password or corrupted data")]
    Decryption,

    #[error("corrupt compressed data: {0}")]
    CorruptData(String),

    #[error("part {part} is too large: {len} bytes (maximum {max})")]
    PartTooLarge { part: u32, len: usize, max: usize },

    /// `input` is the 0-based position of the offending string in the
    /// caller's collection.
    #[error("input #{input} is not a valid multi-part envelope: {reason}")]
    PartParse { input: usize, reason: String },

    #[error("input #{input} claims {found} total parts, expected {expected}")]
    InconsistentParts {
        input: usize,
        expected: u32,
        found: u32,
    },

    #[error("part {part} was supplied more than once")]
    DuplicatePart { part: u32 },

    #[error("missing {} of {total} parts: {}", .missing.len(), format_parts(.missing))]
    MissingParts { missing: Vec<u32>, total: u32 },

    #[error("integrity check failed: reassembled data does not match its hash")]
    IntegrityMismatch,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_parts(parts: &[u32]) -> String {
    parts
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parts_message_names_indices() {
        let err = QrdxError::MissingParts {
            missing: vec![3, 5],
            total: 5,
        };
        assert_eq!(err.to_string(), "missing 2 of 5 parts: 3, 5");
    }

    #[test]
    fn decryption_message_does_not_hint_cause() {
        let msg = QrdxError::Decryption.to_string();
        assert!(msg.contains("wrong password or corrupted data"));
    }
}
