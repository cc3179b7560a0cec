use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use rand::Rng;
use std::fmt;
use std::ops::RangeInclusive;

pub const BLOCK_SIZE: usize = 16;
pub type Block = [u8; BLOCK_SIZE];

/// A keyed permutation on `N`-byte blocks. The key stays inside the
/// implementor; modes only ever see these two calls.
pub trait BlockCipher<const N: usize> {
    fn encrypt_block(&self, block: &[u8; N]) -> [u8; N];
    fn decrypt_block(&self, block: &[u8; N]) -> [u8; N];
}

#[derive(Clone)]
pub struct Aes128 {
    inner: aes::Aes128,
}

impl Aes128 {
    pub fn new(key: &Block) -> Self {
        Self {
            inner: aes::Aes128::new(&GenericArray::from(*key)),
        }
    }
}

impl fmt::Debug for Aes128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Aes128 { .. }")
    }
}

impl BlockCipher<BLOCK_SIZE> for Aes128 {
    fn encrypt_block(&self, block: &Block) -> Block {
        let mut b = GenericArray::from(*block);
        self.inner.encrypt_block(&mut b);
        b.into()
    }

    fn decrypt_block(&self, block: &Block) -> Block {
        let mut b = GenericArray::from(*block);
        self.inner.decrypt_block(&mut b);
        b.into()
    }
}

pub fn random_block<const N: usize, T: Rng + ?Sized>(rng: &mut T) -> [u8; N] {
    rng.gen()
}

pub fn random_bytes<T: Rng + ?Sized>(rng: &mut T, n: usize) -> Vec<u8> {
    (0..n).map(|_| rng.gen()).collect()
}

/// Random bytes with a length drawn from `len`.
pub fn random_bytes_in<T: Rng + ?Sized>(rng: &mut T, len: RangeInclusive<usize>) -> Vec<u8> {
    let n = rng.gen_range(len);
    random_bytes(rng, n)
}
