use crate::cipher::{Block, BlockCipher, BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::xor::break_single_byte;

pub type Nonce = [u8; BLOCK_SIZE / 2];

fn counter_block(nonce: &Nonce, ctr: u64) -> Block {
    let mut blk = [0u8; BLOCK_SIZE];
    blk[..nonce.len()].copy_from_slice(nonce);
    blk[nonce.len()..].copy_from_slice(&ctr.to_le_bytes());
    blk
}

/// CTR keystream: block `j` is `E(nonce || le64(j))`, consumed bytewise.
pub struct Keystream<'a, C> {
    cipher: &'a C,
    nonce: Nonce,
    ctr: u64,
    block: Block,
    pos: usize,
}

impl<'a, C: BlockCipher<BLOCK_SIZE>> Keystream<'a, C> {
    pub fn new(cipher: &'a C, nonce: &Nonce) -> Self {
        Self::at(cipher, nonce, 0)
    }

    /// Keystream positioned at byte `offset`; earlier blocks are never computed.
    pub fn at(cipher: &'a C, nonce: &Nonce, offset: usize) -> Self {
        let ctr = (offset / BLOCK_SIZE) as u64;
        Keystream {
            cipher,
            nonce: *nonce,
            ctr: ctr + 1,
            block: cipher.encrypt_block(&counter_block(nonce, ctr)),
            pos: offset % BLOCK_SIZE,
        }
    }
}

impl<'a, C: BlockCipher<BLOCK_SIZE>> Iterator for Keystream<'a, C> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.pos == BLOCK_SIZE {
            self.block = self
                .cipher
                .encrypt_block(&counter_block(&self.nonce, self.ctr));
            self.ctr = self.ctr.wrapping_add(1);
            self.pos = 0;
        }
        let b = self.block[self.pos];
        self.pos += 1;
        Some(b)
    }
}

pub fn ctr_encrypt<C: BlockCipher<BLOCK_SIZE>>(arr: &[u8], cipher: &C, nonce: &Nonce) -> Vec<u8> {
    arr.iter()
        .zip(Keystream::new(cipher, nonce))
        .map(|(b, k)| b ^ k)
        .collect()
}

/// Same operation as [`ctr_encrypt`]; CTR is its own inverse.
pub fn ctr_decrypt<C: BlockCipher<BLOCK_SIZE>>(arr: &[u8], cipher: &C, nonce: &Nonce) -> Vec<u8> {
    ctr_encrypt(arr, cipher, nonce)
}

/// Re-encrypts `ct` with `newtext` written at byte `offset`. The result grows
/// when `newtext` runs past the end.
pub fn ctr_edit<C: BlockCipher<BLOCK_SIZE>>(
    ct: &[u8],
    cipher: &C,
    nonce: &Nonce,
    offset: usize,
    newtext: &[u8],
) -> Result<Vec<u8>> {
    if offset > ct.len() {
        return Err(Error::LengthMismatch {
            left: ct.len(),
            right: offset,
        });
    }
    let mut res = ct[..offset].to_vec();
    res.extend(
        newtext
            .iter()
            .zip(Keystream::at(cipher, nonce, offset))
            .map(|(b, k)| b ^ k),
    );
    if offset + newtext.len() < ct.len() {
        res.extend_from_slice(&ct[offset + newtext.len()..]);
    }
    Ok(res)
}

/// Recovers the plaintext behind `ct` from a seek-and-rewrite API: writing
/// zeros over the whole ciphertext hands back the raw keystream.
pub fn recover_with_edit(ct: &[u8], edit: impl Fn(&[u8], usize, &[u8]) -> Vec<u8>) -> Vec<u8> {
    let keystream = edit(ct, 0, &vec![0; ct.len()]);
    ct.iter().zip(keystream).map(|(c, k)| c ^ k).collect()
}

/// Statistical break of many ciphertexts sharing one CTR keystream. Every
/// column is treated as single-byte XOR; columns with few samples are
/// unreliable.
pub fn break_fixed_nonce(encrs: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let max_len = encrs.iter().map(Vec::len).max().unwrap_or(0);
    let keystream: Vec<u8> = (0..max_len)
        .map(|i| {
            let column: Vec<u8> = encrs.iter().filter_map(|e| e.get(i).copied()).collect();
            break_single_byte(&column).0
        })
        .collect();
    encrs
        .iter()
        .map(|e| e.iter().zip(&keystream).map(|(c, k)| c ^ k).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{random_block, random_bytes, Aes128};
    use crate::encode::from_base64;
    use rand::Rng;

    #[test]
    fn counter_block_layout() {
        let nonce = [1, 2, 3, 4, 5, 6, 7, 8];
        let blk = counter_block(&nonce, 0x0102);
        assert_eq!(blk[..8], nonce);
        assert_eq!(blk[8..], [0x02, 0x01, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn ctr_decrypts_known_vector() {
        let ct = from_base64(
            "L77na/nrFsKvynd6HzOoG7GHTLXsTVu9qvY/2syLXzhPweyyMTJULu/6/kXX0KSvoOLSFQ==",
        )
        .unwrap();
        let c = Aes128::new(b"YELLOW SUBMARINE");
        let pt = ctr_decrypt(&ct, &c, &[0; 8]);
        assert!(pt.starts_with(b"Yo, VIP Let's kick it Ice, Ice, baby"));
    }

    #[test]
    fn ctr_is_its_own_inverse() {
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let len = rng.gen_range(0..=100);
            let bytes = random_bytes(&mut rng, len);
            let c = Aes128::new(&random_block(&mut rng));
            let nonce = random_block(&mut rng);
            let encr = ctr_encrypt(&bytes, &c, &nonce);
            assert_eq!(encr.len(), bytes.len());
            assert_eq!(ctr_decrypt(&encr, &c, &nonce), bytes);
        }
    }

    #[test]
    fn keystream_can_start_mid_block() {
        let c = Aes128::new(b"YELLOW SUBMARINE");
        let full: Vec<u8> = Keystream::new(&c, &[9; 8]).take(40).collect();
        let tail: Vec<u8> = Keystream::at(&c, &[9; 8], 21).take(19).collect();
        assert_eq!(&full[21..], &tail[..]);
    }

    #[test]
    fn edit_works() {
        let mut rng = rand::thread_rng();
        let c = Aes128::new(&random_block(&mut rng));
        let nonce = random_block(&mut rng);
        let data = vec![b'A'; 40];
        let encr = ctr_encrypt(&data, &c, &nonce);
        let edited = ctr_edit(&encr, &c, &nonce, 18, &[b'B'; 10]).unwrap();
        let decr = ctr_decrypt(&edited, &c, &nonce);
        assert_eq!(&decr[..18], &data[..18]);
        assert_eq!(&decr[18..28], &[b'B'; 10]);
        assert_eq!(&decr[28..], &data[28..]);

        let grown = ctr_edit(&encr, &c, &nonce, 35, &[b'C'; 10]).unwrap();
        assert_eq!(grown.len(), 45);
        assert_eq!(&ctr_decrypt(&grown, &c, &nonce)[35..], &[b'C'; 10]);
        assert!(ctr_edit(&encr, &c, &nonce, 41, b"x").is_err());
    }

    #[test]
    fn recover_with_edit_works() {
        let mut rng = rand::thread_rng();
        let c = Aes128::new(&random_block(&mut rng));
        let nonce = random_block(&mut rng);
        let secret = b"I'm back and I'm ringin' the bell".to_vec();
        let ct = ctr_encrypt(&secret, &c, &nonce);
        let edit = |ct: &[u8], offset: usize, new: &[u8]| {
            ctr_edit(ct, &c, &nonce, offset, new).unwrap_or_default()
        };
        assert_eq!(recover_with_edit(&ct, edit), secret);
    }

    #[test]
    fn break_fixed_nonce_recovers_most_text() {
        let lines: [&[u8]; 16] = [
            b"I have met them at close of day",
            b"Coming with vivid faces",
            b"From counter or desk among grey",
            b"Eighteenth-century houses.",
            b"I have passed with a nod of the head",
            b"Or polite meaningless words,",
            b"Or have lingered awhile and said",
            b"Polite meaningless words,",
            b"Of a mocking tale or a gibe",
            b"To please a companion",
            b"Around the fire at the club,",
            b"Being certain that they and I",
            b"But lived where motley is worn:",
            b"All changed, changed utterly:",
            b"A terrible beauty is born.",
            b"That woman's days were spent",
        ];
        let c = Aes128::new(b"YELLOW SUBMARINE");
        let encrs: Vec<_> = lines.iter().map(|l| ctr_encrypt(l, &c, &[0; 8])).collect();
        let decrs = break_fixed_nonce(&encrs);
        // the first columns have a sample from every line
        let hits = decrs
            .iter()
            .zip(lines)
            .flat_map(|(d, l)| d.iter().zip(l).take(20))
            .filter(|(a, b)| a == b)
            .count();
        assert!(hits > 16 * 20 / 2, "{} hits", hits);
    }
}
