use crate::block::{block_at, detect_ecb, pkcs7};
use crate::cipher::BLOCK_SIZE;
use crate::error::{Error, Result};
use crate::oracle::{EncryptionOracle, Mode, ProfileOracle, PROFILE_HEAD, PROFILE_TAIL};
use rayon::prelude::*;
use tracing::{debug, instrument, trace};

// upper bound on block sizes we try to detect
const MAX_BLOCK_SIZE: usize = 256;

/// What a byte-at-a-time run learned about the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovered {
    pub block_size: usize,
    pub prefix_len: usize,
    pub target: Vec<u8>,
}

/// Feeds growing inputs until the ciphertext grows. Returns the block size
/// and the combined length of everything the oracle adds to the input.
pub fn detect_block_size<O: EncryptionOracle + ?Sized>(oracle: &O) -> Result<(usize, usize)> {
    let empty_len = oracle.encrypt(&[]).len();
    for i in 1..=MAX_BLOCK_SIZE {
        let len = oracle.encrypt(&vec![b'A'; i]).len();
        if len > empty_len {
            let extra = empty_len
                .checked_sub(i)
                .ok_or(Error::Calibration("ciphertext grew faster than input"))?;
            return Ok((len - empty_len, extra));
        }
    }
    Err(Error::Calibration("ciphertext length never grew"))
}

pub fn confirm_ecb<O: EncryptionOracle + ?Sized>(oracle: &O, block_size: usize) -> Result<()> {
    let ct = oracle.encrypt(&vec![b'A'; 3 * block_size]);
    if detect_ecb(&ct, block_size) {
        Ok(())
    } else {
        Err(Error::NotEcb)
    }
}

pub fn detect_mode<O: EncryptionOracle + ?Sized>(oracle: &O) -> Mode {
    let ct = oracle.encrypt(&[0; 3 * BLOCK_SIZE]);
    if detect_ecb(&ct, BLOCK_SIZE) {
        Mode::Ecb
    } else {
        Mode::Cbc
    }
}

fn first_changed_block<O: EncryptionOracle + ?Sized>(oracle: &O, bs: usize, fill: u8) -> usize {
    let a = oracle.encrypt(&[]);
    let b = oracle.encrypt(&[fill]);
    a.chunks(bs)
        .zip(b.chunks(bs))
        .position(|(x, y)| x != y)
        .unwrap_or(a.len().min(b.len()) / bs)
}

fn stable_filler_len<O: EncryptionOracle + ?Sized>(
    oracle: &O,
    bs: usize,
    idx: usize,
    fill: u8,
) -> Option<usize> {
    let probe = |n: usize| block_at(&oracle.encrypt(&vec![fill; n]), idx, bs).map(<[u8]>::to_vec);
    (1..=bs).find(|&n| match (probe(n), probe(n + 1)) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    })
}

/// Length of the hidden prefix. A filler byte that happens to match the
/// start of the target makes both measurements err in the same direction, so
/// two distinct fillers are tried and the consistent answer kept.
pub fn detect_prefix_len<O: EncryptionOracle + ?Sized>(oracle: &O, bs: usize) -> Result<usize> {
    let idx = [b'A', b'B']
        .iter()
        .map(|&f| first_changed_block(oracle, bs, f))
        .min()
        .unwrap_or(0);
    let stable = [b'A', b'B']
        .iter()
        .filter_map(|&f| stable_filler_len(oracle, bs, idx, f))
        .max()
        .ok_or(Error::Calibration("prefix block never stabilised"))?;
    Ok(bs * (idx + 1) - stable)
}

fn recover_target<O: EncryptionOracle + Sync + ?Sized>(
    oracle: &O,
    bs: usize,
    prefix_len: usize,
    target_len: usize,
) -> Result<Vec<u8>> {
    let align = (bs - prefix_len % bs) % bs;
    let offset = (prefix_len + align) / bs;
    let mut target = Vec::with_capacity(target_len);
    while target.len() < target_len {
        let k = target.len();
        let pad_len = bs - 1 - k % bs;
        let ct = oracle.encrypt(&vec![b'A'; align + pad_len]);
        let reference = block_at(&ct, offset + k / bs, bs)?;

        // the bs - 1 known bytes in front of the unknown one
        let mut known = vec![b'A'; pad_len];
        known.extend_from_slice(&target);
        let window = &known[known.len() - (bs - 1)..];
        let mut input = vec![b'A'; align];
        input.extend_from_slice(window);

        let byte = (u8::MIN..=u8::MAX)
            .into_par_iter()
            .find_first(|&b| {
                let mut probe = input.clone();
                probe.push(b);
                block_at(&oracle.encrypt(&probe), offset, bs).map_or(false, |blk| blk == reference)
            })
            .ok_or(Error::BruteForceExhausted)?;
        trace!(pos = k, byte, "recovered byte");
        target.push(byte);
    }
    Ok(target)
}

/// Byte-at-a-time decryption of `E_ecb(input || target)`.
#[instrument(skip_all)]
pub fn decrypt_suffix<O: EncryptionOracle + Sync + ?Sized>(oracle: &O) -> Result<Recovered> {
    let (block_size, combined_len) = detect_block_size(oracle)?;
    confirm_ecb(oracle, block_size)?;
    debug!(block_size, target_len = combined_len, "calibrated");
    let target = recover_target(oracle, block_size, 0, combined_len)?;
    Ok(Recovered {
        block_size,
        prefix_len: 0,
        target,
    })
}

/// Byte-at-a-time decryption of `E_ecb(prefix || input || target)` for an
/// unknown but fixed prefix.
#[instrument(skip_all)]
pub fn decrypt_suffix_with_prefix<O: EncryptionOracle + Sync + ?Sized>(
    oracle: &O,
) -> Result<Recovered> {
    let (block_size, combined_len) = detect_block_size(oracle)?;
    confirm_ecb(oracle, block_size)?;
    let prefix_len = detect_prefix_len(oracle, block_size)?;
    let target_len = combined_len
        .checked_sub(prefix_len)
        .ok_or(Error::Calibration("prefix longer than oracle output"))?;
    debug!(block_size, prefix_len, target_len, "calibrated");
    let target = recover_target(oracle, block_size, prefix_len, target_len)?;
    Ok(Recovered {
        block_size,
        prefix_len,
        target,
    })
}

/// Builds a profile ciphertext with `role=admin` out of two honest ones: the
/// first ends with a block-aligned `role=`, the second contributes a block
/// holding `admin` and its padding.
pub fn forge_admin_profile(oracle: &ProfileOracle) -> Result<Vec<u8>> {
    let bs = BLOCK_SIZE;
    let fixed = PROFILE_HEAD.len() + PROFILE_TAIL.len();
    let email = vec![b'x'; (bs - fixed % bs) % bs];
    let head_blocks = (fixed + email.len()) / bs;
    let ct = oracle.profile_for(&email);
    let mut forged = ct
        .get(..head_blocks * bs)
        .ok_or(Error::LengthMismatch {
            left: ct.len(),
            right: head_blocks * bs,
        })?
        .to_vec();

    let fill = (bs - PROFILE_HEAD.len() % bs) % bs;
    let mut email = vec![b'y'; fill];
    email.extend(pkcs7(b"admin", bs));
    let ct = oracle.profile_for(&email);
    forged.extend_from_slice(block_at(&ct, (PROFILE_HEAD.len() + fill) / bs, bs)?);
    Ok(forged)
}
