use crate::error::{Error, Result};
use std::ops::BitXorAssign;

/// XOR of two equal-length buffers.
pub fn fixed_xor(a: &[u8], b: &[u8]) -> Result<Vec<u8>> {
    if a.len() != b.len() {
        return Err(Error::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.iter().zip(b).map(|(x, y)| x ^ y).collect())
}

/// Repeating-key XOR in place; `key` wraps around when shorter than `v`.
pub fn xor_slice<T: BitXorAssign + Copy>(v: &mut [T], key: &[T]) {
    if key.is_empty() {
        return;
    }
    for (i, x) in v.iter_mut().enumerate() {
        *x ^= key[i % key.len()];
    }
}

pub fn xor_arr<const N: usize, T: BitXorAssign + Copy>(arr: &mut [T; N], key: &[T; N]) {
    for i in 0..N {
        arr[i] ^= key[i];
    }
}

// most to least frequent, space first
const ENGLISH: &[u8] = b" etaoinshrdlcumwfgypbvkjxqz";

/// Crude English-likeness score, higher is better. Letters are weighted by
/// their frequency rank with a nudge towards lowercase, other printable bytes
/// are neutral and control or high bytes are penalised.
pub fn score_english(bytes: &[u8]) -> i64 {
    bytes
        .iter()
        .map(|b| {
            let lower = b.to_ascii_lowercase();
            match ENGLISH.iter().position(|&c| c == lower) {
                Some(rank) => (ENGLISH.len() - rank) as i64 + b.is_ascii_lowercase() as i64,
                None if b.is_ascii_punctuation() || b.is_ascii_digit() || *b == b'\n' => 0,
                None => -20,
            }
        })
        .sum()
}

/// Best single-byte XOR key for `bytes` together with its score.
pub fn break_single_byte(bytes: &[u8]) -> (u8, i64) {
    let mut buf = bytes.to_vec();
    (u8::MIN..=u8::MAX)
        .map(|k| {
            buf.copy_from_slice(bytes);
            xor_slice(&mut buf, &[k]);
            (k, score_english(&buf))
        })
        .max_by_key(|&(_, sc)| sc)
        .unwrap_or((0, 0))
}
