//! zstd compression applied to plaintext before encryption
//!
//! Ciphertext is incompressible, so this is the only place the codec can
//! shrink a payload. The level is fixed per encode (default 16); the
//! decoder doesn't need to know it.

use qrdx_core::{QrdxError, QrdxResult};

/// Compress `data` as a single zstd frame.
pub fn compress(data: &[u8], level: i32) -> QrdxResult<Vec<u8>> {
    let compressed = zstd::encode_all(data, level)?;
    tracing::debug!(
        input = data.len(),
        output = compressed.len(),
        level,
        "compressed"
    );
    Ok(compressed)
}

/// Decompress the output of [`compress`].
pub fn decompress(data: &[u8]) -> QrdxResult<Vec<u8>> {
    zstd::decode_all(data).map_err(|e| QrdxError::CorruptData(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use qrdx_core::DEFAULT_COMPRESSION_LEVEL;

    #[test]
    fn round_trip_small() {
        let data = b"hello zstd";
        let compressed = compress(data, DEFAULT_COMPRESSION_LEVEL).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn round_trip_empty() {
        let compressed = compress(b"", DEFAULT_COMPRESSION_LEVEL).unwrap();
        assert!(decompress(&compressed).unwrap().is_empty());
    }

    #[test]
    fn repetitive_input_shrinks() {
        let data = b"Hello World! ".repeat(1000);
        let compressed = compress(&data, DEFAULT_COMPRESSION_LEVEL).unwrap();
        assert!(compressed.len() < data.len() / 10);
    }

    #[test]
    fn garbage_is_corrupt() {
        let result = decompress(b"definitely not a zstd frame");
        assert!(matches!(result, Err(QrdxError::CorruptData(_))));
    }

    #[test]
    fn truncated_frame_is_corrupt() {
        let compressed = compress(&b"abcdefgh".repeat(64), DEFAULT_COMPRESSION_LEVEL).unwrap();
        let result = decompress(&compressed[..compressed.len() / 2]);
        assert!(matches!(result, Err(QrdxError::CorruptData(_))));
    }

    proptest! {
        #[test]
        fn compress_decompress_roundtrip(
            data in proptest::collection::vec(any::<u8>(), 0..=8192),
            level in 1i32..=19,
        ) {
            let compressed = compress(&data, level).unwrap();
            let out = decompress(&compressed).unwrap();
            prop_assert_eq!(out, data, "round-trip must be identical");
        }
    }
}
