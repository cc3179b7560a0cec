use crate::block::{block_at, blocks};
use crate::cipher::{Block, BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::oracle::{KeyAsIvOracle, PaddingOracle};
use crate::xor::xor_arr;
use rayon::prelude::*;
use tracing::{debug, instrument, trace};

/// Recovers the plaintext of one CBC block from a padding oracle, with `prev`
/// the ciphertext block (or IV) in front of it.
///
/// The block is submitted on its own behind a forged IV. `stack[i]` holds the
/// IV byte that made position `N - 1 - i` decrypt to pad value `i + 1`. A
/// position with no valid candidate means an earlier hit was a lucky longer
/// padding, so the search pops back and resumes the previous position.
pub fn decrypt_block_with_oracle<const N: usize, O>(
    prev: &[u8; N],
    block: &[u8; N],
    oracle: &O,
) -> Result<[u8; N]>
where
    O: PaddingOracle<N> + Sync + ?Sized,
{
    let mut stack: Vec<u8> = Vec::with_capacity(N);
    let mut start = u8::MIN;
    while stack.len() < N {
        let pad = stack.len() + 1;
        let pos = N - pad;
        let mut iv = [0u8; N];
        for (i, &x) in stack.iter().enumerate() {
            iv[N - 1 - i] = x ^ (i + 1) as u8 ^ pad as u8;
        }
        let hit = (start..=u8::MAX).into_par_iter().find_first(|&x| {
            let mut iv = iv;
            iv[pos] = x;
            oracle.check_padding(&iv, block)
        });
        match hit {
            Some(x) => {
                stack.push(x);
                start = u8::MIN;
            }
            None => loop {
                let x = stack.pop().ok_or(Error::BruteForceExhausted)?;
                trace!(pos = N - 1 - stack.len(), "dead end, backtracking");
                if x < u8::MAX {
                    start = x + 1;
                    break;
                }
            },
        }
    }
    let mut pt = [0u8; N];
    for (i, &x) in stack.iter().enumerate() {
        pt[N - 1 - i] = x ^ (i + 1) as u8;
    }
    xor_arr(&mut pt, prev);
    Ok(pt)
}

/// Decrypts a whole CBC ciphertext using only padding checks. Blocks are
/// solved last to first. The result still carries its padding.
#[instrument(skip_all, fields(len = ct.len()))]
pub fn decrypt_with_padding_oracle<const N: usize, O>(
    iv: &[u8; N],
    ct: &[u8],
    oracle: &O,
) -> Result<Vec<u8>>
where
    O: PaddingOracle<N> + Sync + ?Sized,
{
    let blks = blocks::<N>(ct)?;
    let mut pt = vec![0u8; ct.len()];
    for i in (0..blks.len()).rev() {
        let prev = if i == 0 { iv } else { &blks[i - 1] };
        let decr = decrypt_block_with_oracle(prev, &blks[i], oracle)?;
        pt[i * N..(i + 1) * N].copy_from_slice(&decr);
        debug!(block = i, "block recovered");
    }
    Ok(pt)
}

/// Key recovery when the key is reused as the IV. Sends `C1 || 0 || C1` and
/// reads `P1 ^ P3` off the receiver's complaint.
#[instrument(skip_all)]
pub fn recover_key_as_iv(oracle: &KeyAsIvOracle) -> Result<Block> {
    for fill in b'A'..=b'Z' {
        let ct = oracle.encrypt(&[fill; 3 * BLOCK_SIZE]);
        let c1 = block_at(&ct, 0, BLOCK_SIZE)?;
        let mut forged = c1.to_vec();
        forged.extend([0; BLOCK_SIZE]);
        forged.extend_from_slice(c1);
        forged.extend_from_slice(&ct[3 * BLOCK_SIZE..]);
        match oracle.receive(&forged) {
            Err(Error::NonAscii(pt)) => {
                let mut key = [0u8; BLOCK_SIZE];
                key.copy_from_slice(block_at(&pt, 0, BLOCK_SIZE)?);
                let mut p3 = [0u8; BLOCK_SIZE];
                p3.copy_from_slice(block_at(&pt, 2, BLOCK_SIZE)?);
                xor_arr(&mut key, &p3);
                return Ok(key);
            }
            other => debug!(fill, ?other, "receiver did not leak plaintext"),
        }
    }
    Err(Error::BruteForceExhausted)
}
