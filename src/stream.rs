use crate::error::{Error, Result};
use crate::mersenne::Mt19937;
use crate::xor::fixed_xor;
use rayon::prelude::*;
use tracing::{debug, instrument};

/// Keystream of the twister stream cipher: the low byte of every output.
pub fn mt_keystream(seed: u16) -> impl Iterator<Item = u8> {
    let mut mt = Mt19937::from_seed(seed as u32);
    std::iter::repeat_with(move || mt.next_u32() as u8)
}

/// Encrypts or decrypts `arr` under a 16 bit seed.
pub fn mt_encrypt(arr: &[u8], seed: u16) -> Vec<u8> {
    arr.iter().zip(mt_keystream(seed)).map(|(b, k)| b ^ k).collect()
}

/// Seed derived from a unix timestamp, truncated to the cipher's key size.
pub fn time_seed(now: u64) -> u16 {
    (now & 0xffff) as u16
}

fn find_seed(skip: usize, keystream: &[u8]) -> Result<u16> {
    // nothing known matches every seed
    if keystream.is_empty() {
        return Err(Error::BruteForceExhausted);
    }
    (u16::MIN..=u16::MAX)
        .into_par_iter()
        .find_first(|&seed| {
            mt_keystream(seed)
                .skip(skip)
                .zip(keystream)
                .all(|(a, &b)| a == b)
        })
        .ok_or(Error::BruteForceExhausted)
}

/// Recovers the seed from a full plaintext/ciphertext pair.
#[instrument(skip_all, fields(len = pt.len()))]
pub fn recover_seed(pt: &[u8], ct: &[u8]) -> Result<u16> {
    let keystream = fixed_xor(pt, ct)?;
    let seed = find_seed(0, &keystream)?;
    debug!(seed, "recovered stream seed");
    Ok(seed)
}

/// Recovers the seed when only the tail of the plaintext is known, e.g. a
/// chosen input behind a random prefix.
#[instrument(skip_all, fields(len = ct.len(), known = known_suffix.len()))]
pub fn recover_seed_from_suffix(ct: &[u8], known_suffix: &[u8]) -> Result<u16> {
    let Some(skip) = ct.len().checked_sub(known_suffix.len()) else {
        return Err(Error::LengthMismatch {
            left: ct.len(),
            right: known_suffix.len(),
        });
    };
    let keystream = fixed_xor(&ct[skip..], known_suffix)?;
    let seed = find_seed(skip, &keystream)?;
    debug!(seed, prefix_len = skip, "recovered stream seed");
    Ok(seed)
}

/// A password reset token: the first `len` keystream bytes for `seed`.
pub fn reset_token(seed: u16, len: usize) -> Vec<u8> {
    mt_keystream(seed).take(len).collect()
}

/// True iff some 16 bit seed reproduces `token` exactly.
pub fn is_mt_token(token: &[u8]) -> bool {
    (u16::MIN..=u16::MAX)
        .into_par_iter()
        .any(|seed| mt_keystream(seed).zip(token).all(|(a, &b)| a == b))
}
