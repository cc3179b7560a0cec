use crate::cipher::BLOCK_SIZE;
use crate::error::{Error, Result};
use crate::oracle::{CbcCommentOracle, CtrCommentOracle};
use crate::xor::xor_slice;
use tracing::debug;

const FILL: u8 = b'A';

/// Turns a CBC comment ciphertext into one that decrypts with the admin
/// marker. Two filler blocks are sent after the prefix; flipping bits in the
/// first rewrites the second and garbles the first.
pub fn cbc_bitflip(oracle: &CbcCommentOracle) -> Result<Vec<u8>> {
    let bs = BLOCK_SIZE;
    let marker = &oracle.format().marker;
    if marker.len() > bs {
        return Err(Error::LengthMismatch {
            left: marker.len(),
            right: bs,
        });
    }
    let prefix_len = oracle.format().prefix.len();
    let align = (bs - prefix_len % bs) % bs;
    let mut ct = oracle.encrypt(&vec![FILL; align + 2 * bs]);

    let mut delta = marker.clone();
    delta.resize(bs, FILL);
    xor_slice(&mut delta, &[FILL]);
    let start = prefix_len + align;
    debug!(block = start / bs, "flipping block");
    let len = ct.len();
    let blk = ct.get_mut(start..start + bs).ok_or(Error::LengthMismatch {
        left: len,
        right: start + bs,
    })?;
    xor_slice(blk, &delta);
    Ok(ct)
}

/// Same goal under CTR: the marker's delta goes straight onto the filler's
/// own bytes.
pub fn ctr_bitflip(oracle: &CtrCommentOracle) -> Result<Vec<u8>> {
    let marker = &oracle.format().marker;
    let start = oracle.format().prefix.len();
    let mut ct = oracle.encrypt(&vec![FILL; marker.len()]);

    let mut delta = marker.clone();
    xor_slice(&mut delta, &[FILL]);
    let len = ct.len();
    let span = ct.get_mut(start..start + delta.len()).ok_or(Error::LengthMismatch {
        left: len,
        right: start + delta.len(),
    })?;
    xor_slice(span, &delta);
    Ok(ct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::CommentFormat;

    #[test]
    fn cbc_bitflip_makes_admin() {
        let mut rng = rand::thread_rng();
        for _ in 0..10 {
            let oracle = CbcCommentOracle::random(&mut rng, CommentFormat::default());
            let ct = cbc_bitflip(&oracle).unwrap();
            assert_eq!(oracle.is_admin(&ct), Ok(true));
        }
    }

    #[test]
    fn cbc_bitflip_with_unaligned_prefix() {
        let format = CommentFormat {
            prefix: b"id=7;data=".to_vec(),
            ..CommentFormat::default()
        };
        let oracle = CbcCommentOracle::random(&mut rand::thread_rng(), format);
        let ct = cbc_bitflip(&oracle).unwrap();
        assert_eq!(oracle.is_admin(&ct), Ok(true));
    }

    #[test]
    fn ctr_bitflip_makes_admin() {
        let mut rng = rand::thread_rng();
        for _ in 0..10 {
            let oracle = CtrCommentOracle::random(&mut rng, CommentFormat::default());
            let ct = ctr_bitflip(&oracle).unwrap();
            assert!(oracle.is_admin(&ct));
        }
    }

    #[test]
    fn long_marker_does_not_fit_a_block() {
        let format = CommentFormat {
            marker: b";admin=true;role=root;".to_vec(),
            ..CommentFormat::default()
        };
        let oracle = CbcCommentOracle::random(&mut rand::thread_rng(), format.clone());
        assert!(cbc_bitflip(&oracle).is_err());
        // CTR has no such limit
        let oracle = CtrCommentOracle::random(&mut rand::thread_rng(), format);
        assert!(oracle.is_admin(&ctr_bitflip(&oracle).unwrap()));
    }
}
