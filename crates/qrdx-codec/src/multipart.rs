//! Multi-part codec: one sealed blob spread across many transfer units
//!
//! The file is compressed and encrypted exactly once. The sealed blob and a
//! SHA-256 of the plaintext are packed into a payload, and the payload is cut
//! into contiguous byte ranges, one per [`PartEnvelope`].
//!
//! Chunk size is computed from the real CBOR framing, so no encoded part
//! ever exceeds the caller's unit budget. Reassembly accepts parts in any
//! order but insists on exactly `{1..=total}`: duplicates are corruption,
//! gaps are reported by part number.

use std::collections::BTreeMap;

use rayon::prelude::*;
use secrecy::SecretString;

use qrdx_core::{PartInfo, QrdxError, QrdxResult};
use qrdx_crypto::SALT_SIZE;

use crate::envelope::{decode_unit, EncryptedEnvelope, MultiPartPayload, PartEnvelope, MAX_TOTAL_PARTS};
use crate::integrity::{hash_bytes, verify};
use crate::{single, CodecOptions};

/// How a payload will be cut into parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Maximum payload bytes per part (the last part may be shorter)
    pub chunk_size: usize,
    /// Number of parts, `ceil(payload_len / chunk_size)`
    pub total_parts: u32,
}

/// Largest raw length whose padded base64 form fits in `max_unit_bytes`.
fn raw_budget(max_unit_bytes: usize) -> usize {
    max_unit_bytes / 4 * 3
}

/// Length of the CBOR header in front of a `len`-byte byte string.
fn byte_string_header_len(len: usize) -> usize {
    match len as u64 {
        0..=23 => 1,
        24..=0xff => 2,
        0x100..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Bytes a part envelope adds around a `chunk_len`-byte chunk when the set
/// has `total_parts` parts. Measured on the widest envelope of the set
/// (part number == total) with an empty chunk, then corrected for the
/// chunk's length header.
fn envelope_overhead(total_parts: u32, chunk_len: usize) -> QrdxResult<usize> {
    let framing = PartEnvelope::new(total_parts, total_parts, Vec::new())
        .to_bytes()?
        .len();
    Ok(framing - byte_string_header_len(0) + byte_string_header_len(chunk_len))
}

/// Largest chunk that fits in `budget` raw bytes alongside its framing.
fn max_chunk_len(budget: usize, total_parts: u32) -> QrdxResult<usize> {
    let mut chunk = budget.saturating_sub(envelope_overhead(total_parts, budget)?);
    // The framing above was sized for a `budget`-byte chunk; a smaller chunk
    // may have a shorter length header and leave room for a few more bytes.
    while chunk + 1 + envelope_overhead(total_parts, chunk + 1)? <= budget {
        chunk += 1;
    }
    Ok(chunk)
}

/// Decide the chunk size and part count for a payload of `payload_len`
/// bytes under a per-unit budget of `max_unit_bytes` (base64 characters).
pub fn plan_chunks(payload_len: usize, max_unit_bytes: usize) -> QrdxResult<ChunkPlan> {
    let budget = raw_budget(max_unit_bytes);

    // Integer fields widen as the part count grows; re-plan until the
    // assumed count's framing covers the real one.
    let mut assumed: u32 = 1;
    loop {
        let chunk_size = max_chunk_len(budget, assumed)?;
        if chunk_size == 0 {
            return Err(QrdxError::Configuration(format!(
                "max_unit_bytes = {max_unit_bytes} leaves no room for chunk data"
            )));
        }

        let parts = payload_len.div_ceil(chunk_size).max(1);
        let total_parts = u32::try_from(parts)
            .ok()
            .filter(|&n| n <= MAX_TOTAL_PARTS)
            .ok_or_else(|| {
                QrdxError::Configuration(format!(
                    "payload needs {parts} parts of {chunk_size} bytes, more than the \
                     {MAX_TOTAL_PARTS} a transfer can hold"
                ))
            })?;

        if total_parts <= assumed
            || envelope_overhead(total_parts, chunk_size)? == envelope_overhead(assumed, chunk_size)?
        {
            return Ok(ChunkPlan {
                chunk_size,
                total_parts,
            });
        }
        assumed = total_parts;
    }
}

/// Encrypt `raw` once and split it into transfer units of at most
/// `max_unit_bytes` characters each, ordered by part number.
pub fn split(
    raw: &[u8],
    password: &SecretString,
    max_unit_bytes: usize,
    opts: &CodecOptions,
) -> QrdxResult<Vec<String>> {
    let sealed = single::seal(raw, password, opts)?;
    split_sealed(raw, sealed, max_unit_bytes)
}

/// Split an already sealed blob. `raw` is only hashed.
pub(crate) fn split_sealed(raw: &[u8], sealed: Vec<u8>, max_unit_bytes: usize) -> QrdxResult<Vec<String>> {
    let payload = MultiPartPayload {
        blob: sealed,
        hash: hash_bytes(raw).to_vec(),
    }
    .to_bytes()?;

    let plan = plan_chunks(payload.len(), max_unit_bytes)?;
    tracing::info!(
        parts = plan.total_parts,
        chunk_size = plan.chunk_size,
        payload = payload.len(),
        "splitting into parts"
    );

    payload
        .chunks(plan.chunk_size)
        .zip(1u32..)
        .map(|(chunk, part_number)| {
            let unit = PartEnvelope::new(part_number, plan.total_parts, chunk.to_vec()).to_unit()?;
            if unit.len() > max_unit_bytes {
                return Err(QrdxError::PartTooLarge {
                    part: part_number,
                    len: unit.len(),
                    max: max_unit_bytes,
                });
            }
            tracing::debug!(part = part_number, len = unit.len(), "part created");
            Ok(unit)
        })
        .collect()
}

/// Rebuild the original bytes from a complete set of part units, given in
/// any order.
pub fn reassemble<S>(units: &[S], password: &SecretString, opts: &CodecOptions) -> QrdxResult<Vec<u8>>
where
    S: AsRef<str> + Sync,
{
    if units.is_empty() {
        return Err(QrdxError::InvalidArgument("no transfer units supplied".into()));
    }

    let parsed: Vec<Result<PartEnvelope, String>> = units
        .par_iter()
        .map(|unit| PartEnvelope::from_unit(unit.as_ref()))
        .collect();

    let mut envelopes = Vec::with_capacity(parsed.len());
    for (input, result) in parsed.into_iter().enumerate() {
        envelopes.push(result.map_err(|reason| QrdxError::PartParse { input, reason })?);
    }

    let total = envelopes[0].total_parts;
    if let Some((input, env)) = envelopes
        .iter()
        .enumerate()
        .find(|(_, env)| env.total_parts != total)
    {
        return Err(QrdxError::InconsistentParts {
            input,
            expected: total,
            found: env.total_parts,
        });
    }

    let mut chunks: BTreeMap<u32, Vec<u8>> = BTreeMap::new();
    for env in envelopes {
        let part = env.part_number;
        if chunks.insert(part, env.chunk).is_some() {
            return Err(QrdxError::DuplicatePart { part });
        }
    }

    let missing: Vec<u32> = (1..=total).filter(|n| !chunks.contains_key(n)).collect();
    if !missing.is_empty() {
        tracing::warn!(have = chunks.len(), total, ?missing, "incomplete part set");
        return Err(QrdxError::MissingParts { missing, total });
    }

    // BTreeMap yields chunks in ascending part order.
    let payload: Vec<u8> = chunks.into_values().flatten().collect();
    let payload = MultiPartPayload::from_bytes(&payload).map_err(|reason| {
        tracing::warn!("reassembled payload rejected: {reason}");
        QrdxError::Decryption
    })?;

    let raw = single::open(&payload.blob, password, opts)?;
    if !verify(&raw, &payload.hash) {
        return Err(QrdxError::IntegrityMismatch);
    }

    tracing::info!(parts = total, bytes = raw.len(), "reassembled and verified");
    Ok(raw)
}

/// Position of a part unit within its set. Needs no password.
///
/// A well-formed single-part unit yields `Ok(None)`; text that is neither
/// kind of unit is a [`QrdxError::PartParse`].
pub fn part_info(unit: &str) -> QrdxResult<Option<PartInfo>> {
    match PartEnvelope::from_unit(unit) {
        Ok(env) => Ok(Some(env.info())),
        Err(_) if is_single_part(unit) => Ok(None),
        Err(reason) => Err(QrdxError::PartParse { input: 0, reason }),
    }
}

/// Whether `unit` is a multi-part envelope. Single-part units (and
/// anything unparseable) return `false`.
pub fn is_multi_part(unit: &str) -> bool {
    matches!(part_info(unit), Ok(Some(_)))
}

fn is_single_part(unit: &str) -> bool {
    decode_unit(unit)
        .ok()
        .and_then(|bytes| EncryptedEnvelope::from_bytes(&bytes).ok())
        .is_some_and(|env| env.salt.len() == SALT_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fast_options, noise};

    fn pw(s: &str) -> SecretString {
        SecretString::from(s)
    }

    #[test]
    fn plan_respects_budget_exactly() {
        for max in [40usize, 100, 257, 500, 1273, 2953] {
            for payload_len in [1usize, 50, 999, 13_000, 200_000] {
                let plan = plan_chunks(payload_len, max).unwrap();
                let env = PartEnvelope::new(plan.total_parts, plan.total_parts, vec![0; plan.chunk_size]);
                let unit = env.to_unit().unwrap();
                assert!(unit.len() <= max, "max={max} len={payload_len}: {}", unit.len());
                assert_eq!(
                    plan.total_parts as usize,
                    payload_len.div_ceil(plan.chunk_size),
                    "max={max} len={payload_len}"
                );
            }
        }
    }

    #[test]
    fn plan_is_tight() {
        // One more byte per chunk would overflow the budget.
        let max = 500;
        let plan = plan_chunks(13_000, max).unwrap();
        let env = PartEnvelope::new(plan.total_parts, plan.total_parts, vec![0; plan.chunk_size + 1]);
        assert!(env.to_bytes().unwrap().len() > raw_budget(max));
    }

    #[test]
    fn plan_accounts_for_wide_part_numbers() {
        // Tiny units force more than 255 parts, widening p and t.
        let plan = plan_chunks(20_000, 40).unwrap();
        assert!(plan.total_parts > 255);
        let env = PartEnvelope::new(plan.total_parts, plan.total_parts, vec![0; plan.chunk_size]);
        assert!(env.to_unit().unwrap().len() <= 40);
    }

    #[test]
    fn tiny_budget_is_configuration_error() {
        for max in [0usize, 4, 12] {
            assert!(
                matches!(plan_chunks(100, max), Err(QrdxError::Configuration(_))),
                "max={max}"
            );
        }
    }

    #[test]
    fn too_many_parts_is_configuration_error() {
        let result = plan_chunks(10_000_000, 40);
        assert!(matches!(result, Err(QrdxError::Configuration(_))));
    }

    #[test]
    fn split_and_reassemble() {
        let opts = fast_options();
        let data = noise(6000);

        let units = split(&data, &pw("pw"), 300, &opts).unwrap();
        assert!(units.len() > 1);
        for (i, unit) in units.iter().enumerate() {
            assert!(unit.len() <= 300);
            let info = part_info(unit).unwrap().unwrap();
            assert_eq!(info.part_number as usize, i + 1);
            assert_eq!(info.total_parts as usize, units.len());
            assert!(is_multi_part(unit));
        }

        assert_eq!(reassemble(&units, &pw("pw"), &opts).unwrap(), data);
    }

    #[test]
    fn small_payload_still_splits_into_one_part() {
        let opts = fast_options();
        let units = split(b"tiny", &pw("pw"), 2953, &opts).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(
            part_info(&units[0]).unwrap(),
            Some(PartInfo { part_number: 1, total_parts: 1 })
        );
        assert_eq!(reassemble(&units, &pw("pw"), &opts).unwrap(), b"tiny");
    }

    #[test]
    fn empty_input_is_invalid_argument() {
        let units: Vec<String> = Vec::new();
        let result = reassemble(&units, &pw("pw"), &fast_options());
        assert!(matches!(result, Err(QrdxError::InvalidArgument(_))));
    }

    #[test]
    fn malformed_part_names_input() {
        let opts = fast_options();
        let mut units = split(&noise(3000), &pw("pw"), 200, &opts).unwrap();
        units[1] = "garbage!".into();
        match reassemble(&units, &pw("pw"), &opts) {
            Err(QrdxError::PartParse { input, .. }) => assert_eq!(input, 1),
            other => panic!("expected PartParse, got {other:?}"),
        }
    }

    #[test]
    fn inconsistent_totals() {
        let units = vec![
            PartEnvelope::new(1, 2, vec![1]).to_unit().unwrap(),
            PartEnvelope::new(2, 3, vec![2]).to_unit().unwrap(),
        ];
        match reassemble(&units, &pw("pw"), &fast_options()) {
            Err(QrdxError::InconsistentParts {
                input,
                expected,
                found,
            }) => {
                assert_eq!((input, expected, found), (1, 2, 3));
            }
            other => panic!("expected InconsistentParts, got {other:?}"),
        }
    }

    #[test]
    fn identical_duplicate_is_rejected() {
        let opts = fast_options();
        let mut units = split(&noise(4000), &pw("pw"), 200, &opts).unwrap();
        units.push(units[0].clone());
        assert!(matches!(
            reassemble(&units, &pw("pw"), &opts),
            Err(QrdxError::DuplicatePart { part: 1 })
        ));
    }

    #[test]
    fn conflicting_duplicate_is_rejected() {
        let units = vec![
            PartEnvelope::new(1, 2, vec![1]).to_unit().unwrap(),
            PartEnvelope::new(2, 2, vec![2]).to_unit().unwrap(),
            PartEnvelope::new(2, 2, vec![9]).to_unit().unwrap(),
        ];
        assert!(matches!(
            reassemble(&units, &pw("pw"), &fast_options()),
            Err(QrdxError::DuplicatePart { part: 2 })
        ));
    }

    #[test]
    fn missing_parts_are_listed() {
        let opts = fast_options();
        let units = split(&noise(6000), &pw("pw"), 150, &opts).unwrap();
        assert!(units.len() >= 5);
        let total = units.len() as u32;

        let kept: Vec<String> = units
            .iter()
            .filter(|u| {
                let n = part_info(u).unwrap().unwrap().part_number;
                n != 3 && n != 5
            })
            .cloned()
            .collect();

        match reassemble(&kept, &pw("pw"), &opts) {
            Err(QrdxError::MissingParts { missing, total: t }) => {
                assert_eq!(missing, vec![3, 5]);
                assert_eq!(t, total);
            }
            other => panic!("expected MissingParts, got {other:?}"),
        }
    }

    #[test]
    fn hash_mismatch_is_integrity_error() {
        let opts = fast_options();
        let sealed = single::seal(b"original", &pw("pw"), &opts).unwrap();
        let payload = MultiPartPayload {
            blob: sealed,
            hash: hash_bytes(b"something else").to_vec(),
        }
        .to_bytes()
        .unwrap();
        let unit = PartEnvelope::new(1, 1, payload).to_unit().unwrap();

        assert!(matches!(
            reassemble(&[unit], &pw("pw"), &opts),
            Err(QrdxError::IntegrityMismatch)
        ));
    }

    #[test]
    fn unparseable_payload_is_decryption_error() {
        let unit = PartEnvelope::new(1, 1, b"not cbor at all".to_vec()).to_unit().unwrap();
        assert!(matches!(
            reassemble(&[unit], &pw("pw"), &fast_options()),
            Err(QrdxError::Decryption)
        ));
    }

    #[test]
    fn wrong_password_is_decryption_error() {
        let opts = fast_options();
        let units = split(&[1u8; 2000], &pw("right"), 200, &opts).unwrap();
        assert!(matches!(
            reassemble(&units, &pw("wrong"), &opts),
            Err(QrdxError::Decryption)
        ));
    }

    #[test]
    fn single_part_unit_is_not_a_part() {
        let opts = fast_options();
        let unit = single::serialize(b"single", &pw("pw"), &opts).unwrap();
        assert!(!is_multi_part(&unit));
        assert_eq!(part_info(&unit).unwrap(), None);
        assert_eq!(part_info(&format!("{unit}\n")).unwrap(), None);
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        let opts = fast_options();
        let mut future = PartEnvelope::new(1, 2, vec![1, 2, 3]);
        future.version = 3;
        let future = future.to_unit().unwrap();

        let sealed = single::seal(b"x", &pw("pw"), &opts).unwrap();
        let truncated = crate::envelope::encode_unit(&sealed[..sealed.len() / 2]);

        for unit in ["not even base64 ~~", "aGVsbG8=", future.as_str(), truncated.as_str()] {
            assert!(!is_multi_part(unit), "{unit:?}");
            assert!(
                matches!(part_info(unit), Err(QrdxError::PartParse { input: 0, .. })),
                "{unit:?}"
            );
        }
    }

    #[test]
    fn overhead_matches_real_framing() {
        for total in [1u32, 23, 24, 255, 256, 65_535] {
            for chunk_len in [0usize, 1, 23, 24, 255, 256, 65_535, 65_536] {
                let real = PartEnvelope::new(total, total, vec![0u8; chunk_len])
                    .to_bytes()
                    .unwrap()
                    .len();
                assert_eq!(
                    envelope_overhead(total, chunk_len).unwrap() + chunk_len,
                    real,
                    "total={total} chunk_len={chunk_len}"
                );
            }
        }
    }

    #[test]
    fn huge_budget_plans_without_allocating_it() {
        let plan = plan_chunks(10, usize::MAX / 2).unwrap();
        assert_eq!(plan.total_parts, 1);
        assert!(plan.chunk_size > 10);

        let opts = fast_options();
        let units = split(b"small file", &pw("pw"), usize::MAX / 2, &opts).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(reassemble(&units, &pw("pw"), &opts).unwrap(), b"small file");
    }
}
