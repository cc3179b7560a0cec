//! Scenario objects. Each one is built once with its secrets and then only
//! answers the narrow queries an attacker is allowed to make.

use crate::block::{
    cbc_decrypt, cbc_decrypt_blocks, cbc_encrypt, ecb_decrypt, ecb_encrypt, validate_pkcs7,
};
use crate::cipher::{random_block, random_bytes_in, Aes128, Block, BLOCK_SIZE};
use crate::ctr::{ctr_decrypt, ctr_edit, ctr_encrypt, Nonce};
use crate::encode::from_base64;
use crate::error::{Error, Result};
use crate::stream::mt_encrypt;
use rand::Rng;
use std::ops::RangeInclusive;

pub trait EncryptionOracle {
    fn encrypt(&self, input: &[u8]) -> Vec<u8>;
}

impl<F: Fn(&[u8]) -> Vec<u8>> EncryptionOracle for F {
    fn encrypt(&self, input: &[u8]) -> Vec<u8> {
        self(input)
    }
}

pub trait PaddingOracle<const N: usize> {
    fn check_padding(&self, iv: &[u8; N], ct: &[u8]) -> bool;
}

impl<const N: usize, F: Fn(&[u8; N], &[u8]) -> bool> PaddingOracle<N> for F {
    fn check_padding(&self, iv: &[u8; N], ct: &[u8]) -> bool {
        self(iv, ct)
    }
}

/// `E_ecb(prefix || input || target)` under a hidden key.
#[derive(Debug, Clone)]
pub struct EcbOracle {
    cipher: Aes128,
    prefix: Vec<u8>,
    target: Vec<u8>,
}

impl EcbOracle {
    pub fn new(cipher: Aes128, prefix: Vec<u8>, target: Vec<u8>) -> Self {
        EcbOracle {
            cipher,
            prefix,
            target,
        }
    }

    pub fn random<T: Rng + ?Sized>(
        rng: &mut T,
        prefix_len: RangeInclusive<usize>,
        target: Vec<u8>,
    ) -> Self {
        let cipher = Aes128::new(&random_block(rng));
        let prefix = random_bytes_in(rng, prefix_len);
        Self::new(cipher, prefix, target)
    }
}

impl EncryptionOracle for EcbOracle {
    fn encrypt(&self, input: &[u8]) -> Vec<u8> {
        let pt = [&self.prefix[..], input, &self.target[..]].concat();
        ecb_encrypt(&pt, &self.cipher)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Ecb,
    Cbc,
}

/// ECB or CBC by coin flip, with 5 to 10 random bytes on either side.
#[derive(Debug, Clone)]
pub struct ModeOracle {
    mode: Mode,
    cipher: Aes128,
    iv: Block,
    before: Vec<u8>,
    after: Vec<u8>,
}

impl ModeOracle {
    pub fn random<T: Rng + ?Sized>(rng: &mut T) -> Self {
        let mode = if rng.gen_bool(0.5) {
            Mode::Ecb
        } else {
            Mode::Cbc
        };
        ModeOracle {
            mode,
            cipher: Aes128::new(&random_block(rng)),
            iv: random_block(rng),
            before: random_bytes_in(rng, 5..=10),
            after: random_bytes_in(rng, 5..=10),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

impl EncryptionOracle for ModeOracle {
    fn encrypt(&self, input: &[u8]) -> Vec<u8> {
        let pt = [&self.before[..], input, &self.after[..]].concat();
        match self.mode {
            Mode::Ecb => ecb_encrypt(&pt, &self.cipher),
            Mode::Cbc => cbc_encrypt(&pt, &self.cipher, &self.iv),
        }
    }
}

pub const PADDING_SECRETS: [&str; 10] = [
    "MDAwMDAwTm93IHRoYXQgdGhlIHBhcnR5IGlzIGp1bXBpbmc=",
    "MDAwMDAxV2l0aCB0aGUgYmFzcyBraWNrZWQgaW4gYW5kIHRoZSBWZWdhJ3MgYXJlIHB1bXBpbic=",
    "MDAwMDAyUXVpY2sgdG8gdGhlIHBvaW50LCB0byB0aGUgcG9pbnQsIG5vIGZha2luZw==",
    "MDAwMDAzQ29va2luZyBNQydzIGxpa2UgYSBwb3VuZCBvZiBiYWNvbg==",
    "MDAwMDA0QnVybmluZyAnZW0sIGlmIHlvdSBhaW4ndCBxdWljayBhbmQgbmltYmxl",
    "MDAwMDA1SSBnbyBjcmF6eSB3aGVuIEkgaGVhciBhIGN5bWJhbA==",
    "MDAwMDA2QW5kIGEgaGlnaCBoYXQgd2l0aCBhIHNvdXBlZCB1cCB0ZW1wbw==",
    "MDAwMDA3SSdtIG9uIGEgcm9sbCwgaXQncyB0aW1lIHRvIGdvIHNvbG8=",
    "MDAwMDA4b2xsaW4nIGluIG15IGZpdmUgcG9pbnQgb2g=",
    "MDAwMDA5aXRoIG15IHJhZy10b3AgZG93biBzbyBteSBoYWlyIGNhbiBibG93",
];

#[derive(Debug, Clone)]
pub struct CbcPaddingOracle {
    cipher: Aes128,
    iv: Block,
    secret: Vec<u8>,
}

impl CbcPaddingOracle {
    pub fn new(cipher: Aes128, iv: Block, secret: Vec<u8>) -> Self {
        CbcPaddingOracle { cipher, iv, secret }
    }

    pub fn random<T: Rng + ?Sized>(rng: &mut T) -> Result<Self> {
        let idx = rng.gen_range(0..PADDING_SECRETS.len());
        let secret = from_base64(PADDING_SECRETS[idx])?;
        Ok(Self::new(
            Aes128::new(&random_block(rng)),
            random_block(rng),
            secret,
        ))
    }

    pub fn ciphertext(&self) -> (Block, Vec<u8>) {
        (self.iv, cbc_encrypt(&self.secret, &self.cipher, &self.iv))
    }
}

impl PaddingOracle<BLOCK_SIZE> for CbcPaddingOracle {
    fn check_padding(&self, iv: &Block, ct: &[u8]) -> bool {
        cbc_decrypt(ct, &self.cipher, iv).is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentFormat {
    pub prefix: Vec<u8>,
    pub suffix: Vec<u8>,
    pub marker: Vec<u8>,
}

impl Default for CommentFormat {
    fn default() -> Self {
        CommentFormat {
            prefix: b"comment1=cooking%20MCs;userdata=".to_vec(),
            suffix: b";comment2=%20like%20a%20pound%20of%20bacon".to_vec(),
            marker: b";admin=true;".to_vec(),
        }
    }
}

impl CommentFormat {
    // `;` and `=` are quoted as `';'` and `'='`
    pub fn wrap(&self, userdata: &[u8]) -> Vec<u8> {
        let mut v = self.prefix.clone();
        for &b in userdata {
            match b {
                b';' | b'=' => v.extend([b'\'', b, b'\'']),
                _ => v.push(b),
            }
        }
        v.extend_from_slice(&self.suffix);
        v
    }

    pub fn has_marker(&self, pt: &[u8]) -> bool {
        !self.marker.is_empty() && pt.windows(self.marker.len()).any(|w| w == &self.marker[..])
    }
}

#[derive(Debug, Clone)]
pub struct CbcCommentOracle {
    cipher: Aes128,
    iv: Block,
    format: CommentFormat,
}

impl CbcCommentOracle {
    pub fn new(cipher: Aes128, iv: Block, format: CommentFormat) -> Self {
        CbcCommentOracle { cipher, iv, format }
    }

    pub fn random<T: Rng + ?Sized>(rng: &mut T, format: CommentFormat) -> Self {
        Self::new(Aes128::new(&random_block(rng)), random_block(rng), format)
    }

    pub fn format(&self) -> &CommentFormat {
        &self.format
    }

    pub fn encrypt(&self, userdata: &[u8]) -> Vec<u8> {
        cbc_encrypt(&self.format.wrap(userdata), &self.cipher, &self.iv)
    }

    pub fn is_admin(&self, ct: &[u8]) -> Result<bool> {
        let pt = cbc_decrypt(ct, &self.cipher, &self.iv)?;
        Ok(self.format.has_marker(&pt))
    }
}

#[derive(Debug, Clone)]
pub struct CtrCommentOracle {
    cipher: Aes128,
    nonce: Nonce,
    format: CommentFormat,
}

impl CtrCommentOracle {
    pub fn new(cipher: Aes128, nonce: Nonce, format: CommentFormat) -> Self {
        CtrCommentOracle {
            cipher,
            nonce,
            format,
        }
    }

    pub fn random<T: Rng + ?Sized>(rng: &mut T, format: CommentFormat) -> Self {
        Self::new(Aes128::new(&random_block(rng)), random_block(rng), format)
    }

    pub fn format(&self) -> &CommentFormat {
        &self.format
    }

    pub fn encrypt(&self, userdata: &[u8]) -> Vec<u8> {
        ctr_encrypt(&self.format.wrap(userdata), &self.cipher, &self.nonce)
    }

    pub fn is_admin(&self, ct: &[u8]) -> bool {
        self.format
            .has_marker(&ctr_decrypt(ct, &self.cipher, &self.nonce))
    }
}

/// CBC with key as IV. Non-ASCII plaintext is echoed back in the error.
#[derive(Debug, Clone)]
pub struct KeyAsIvOracle {
    cipher: Aes128,
    key: Block,
}

impl KeyAsIvOracle {
    pub fn new(key: Block) -> Self {
        KeyAsIvOracle {
            cipher: Aes128::new(&key),
            key,
        }
    }

    pub fn random<T: Rng + ?Sized>(rng: &mut T) -> Self {
        Self::new(random_block(rng))
    }

    pub fn encrypt(&self, pt: &[u8]) -> Vec<u8> {
        cbc_encrypt(pt, &self.cipher, &self.key)
    }

    pub fn receive(&self, ct: &[u8]) -> Result<()> {
        let pt = cbc_decrypt_blocks(ct, &self.cipher, &self.key)?;
        if !pt.is_ascii() {
            return Err(Error::NonAscii(pt));
        }
        validate_pkcs7(&pt, BLOCK_SIZE).map(|_| ())
    }
}

pub const PROFILE_HEAD: &str = "email=";
pub const PROFILE_TAIL: &str = "&uid=10&role=";

pub fn parse_kv(s: &str) -> Vec<(&str, &str)> {
    s.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .collect()
}

/// `email=<email>&uid=10&role=user`, with `&` and `=` dropped from the email.
pub fn encode_profile(email: &str) -> String {
    let email: String = email.chars().filter(|&c| c != '&' && c != '=').collect();
    format!("{}{}{}user", PROFILE_HEAD, email, PROFILE_TAIL)
}

#[derive(Debug, Clone)]
pub struct ProfileOracle {
    cipher: Aes128,
}

impl ProfileOracle {
    pub fn new(cipher: Aes128) -> Self {
        ProfileOracle { cipher }
    }

    pub fn random<T: Rng + ?Sized>(rng: &mut T) -> Self {
        Self::new(Aes128::new(&random_block(rng)))
    }

    pub fn profile_for(&self, email: &[u8]) -> Vec<u8> {
        let email = String::from_utf8_lossy(email);
        ecb_encrypt(encode_profile(&email).as_bytes(), &self.cipher)
    }

    // later keys win
    pub fn role_of(&self, ct: &[u8]) -> Result<String> {
        let pt = ecb_decrypt(ct, &self.cipher)?;
        let pt = String::from_utf8_lossy(&pt);
        parse_kv(&pt)
            .into_iter()
            .rev()
            .find(|(k, _)| *k == "role")
            .map(|(_, v)| v.to_string())
            .ok_or(Error::MissingField("role"))
    }
}

#[derive(Debug, Clone)]
pub struct CtrEditOracle {
    cipher: Aes128,
    nonce: Nonce,
    ct: Vec<u8>,
}

impl CtrEditOracle {
    pub fn new(cipher: Aes128, nonce: Nonce, pt: &[u8]) -> Self {
        let ct = ctr_encrypt(pt, &cipher, &nonce);
        CtrEditOracle { cipher, nonce, ct }
    }

    pub fn random<T: Rng + ?Sized>(rng: &mut T, pt: &[u8]) -> Self {
        Self::new(Aes128::new(&random_block(rng)), random_block(rng), pt)
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ct
    }

    pub fn edit(&self, ct: &[u8], offset: usize, newtext: &[u8]) -> Result<Vec<u8>> {
        ctr_edit(ct, &self.cipher, &self.nonce, offset, newtext)
    }
}

#[derive(Debug, Clone)]
pub struct MtStreamOracle {
    seed: u16,
    prefix: Vec<u8>,
}

impl MtStreamOracle {
    pub fn new(seed: u16, prefix: Vec<u8>) -> Self {
        MtStreamOracle { seed, prefix }
    }

    pub fn random<T: Rng + ?Sized>(rng: &mut T, prefix_len: RangeInclusive<usize>) -> Self {
        let seed = rng.gen();
        Self::new(seed, random_bytes_in(rng, prefix_len))
    }
}

impl EncryptionOracle for MtStreamOracle {
    fn encrypt(&self, input: &[u8]) -> Vec<u8> {
        mt_encrypt(&[&self.prefix[..], input].concat(), self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::detect_ecb;
    use crate::cipher::random_bytes;

    #[test]
    fn closures_are_oracles() {
        let c = Aes128::new(b"YELLOW SUBMARINE");
        let oracle = |input: &[u8]| ecb_encrypt(input, &c);
        assert_eq!(oracle.encrypt(b"abc").len(), 16);
        let check = |iv: &Block, ct: &[u8]| cbc_decrypt(ct, &c, iv).is_ok();
        let ct = cbc_encrypt(b"abc", &c, &[1; 16]);
        assert!(check.check_padding(&[1; 16], &ct));
    }

    #[test]
    fn ecb_oracle_wraps_input() {
        let c = Aes128::new(b"YELLOW SUBMARINE");
        let oracle = EcbOracle::new(c.clone(), b"pre".to_vec(), b"target".to_vec());
        let ct = oracle.encrypt(b"-");
        assert_eq!(ecb_decrypt(&ct, &c), Ok(b"pre-target".to_vec()));
    }

    #[test]
    fn mode_oracle_mode_shows_in_ciphertext() {
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let oracle = ModeOracle::random(&mut rng);
            let ct = oracle.encrypt(&[0; 3 * BLOCK_SIZE]);
            assert_eq!(detect_ecb(&ct, BLOCK_SIZE), oracle.mode() == Mode::Ecb);
        }
    }

    #[test]
    fn padding_secrets_decode() {
        for s in PADDING_SECRETS {
            let v = from_base64(s).unwrap();
            assert!(v.starts_with(b"00000"));
        }
    }

    #[test]
    fn padding_oracle_accepts_own_token() {
        let mut rng = rand::thread_rng();
        let oracle = CbcPaddingOracle::random(&mut rng).unwrap();
        let (iv, ct) = oracle.ciphertext();
        assert!(oracle.check_padding(&iv, &ct));
        let mut bad = ct.clone();
        // pushes the last pad byte above the block size
        let n = bad.len();
        bad[n - BLOCK_SIZE - 1] ^= 0x80;
        assert!(!oracle.check_padding(&iv, &bad));
        assert!(!oracle.check_padding(&iv, &ct[..ct.len() - 1]));
    }

    #[test]
    fn comment_format_quotes_metacharacters() {
        let fmt = CommentFormat::default();
        let wrapped = fmt.wrap(b";admin=true;");
        assert!(!fmt.has_marker(&wrapped));
        let tail = b"';'admin'='true';';comment2=%20like%20a%20pound%20of%20bacon";
        assert!(wrapped.ends_with(tail));
        assert!(fmt.has_marker(b"xx;admin=true;yy"));
    }

    #[test]
    fn comment_oracles_reject_naive_admin() {
        let mut rng = rand::thread_rng();
        let cbc = CbcCommentOracle::random(&mut rng, CommentFormat::default());
        assert_eq!(cbc.is_admin(&cbc.encrypt(b";admin=true;")), Ok(false));
        let ctr = CtrCommentOracle::random(&mut rng, CommentFormat::default());
        assert!(!ctr.is_admin(&ctr.encrypt(b";admin=true;")));
    }

    #[test]
    fn key_as_iv_receiver() {
        let mut rng = rand::thread_rng();
        let oracle = KeyAsIvOracle::random(&mut rng);
        let ct = oracle.encrypt(b"all ascii here, nothing to see");
        assert_eq!(oracle.receive(&ct), Ok(()));
        let noisy = oracle.encrypt(&[0xff; 20]);
        assert!(matches!(oracle.receive(&noisy), Err(Error::NonAscii(pt)) if pt[0] == 0xff));
        assert!(oracle.receive(&ct[1..]).is_err());
    }

    #[test]
    fn parse_kv_works() {
        assert_eq!(
            parse_kv("foo=bar&baz=qux&zap=zazzle"),
            vec![("foo", "bar"), ("baz", "qux"), ("zap", "zazzle")]
        );
        assert_eq!(parse_kv("a&b=c"), vec![("a", ""), ("b", "c")]);
    }

    #[test]
    fn profile_strips_metacharacters() {
        assert_eq!(
            encode_profile("foo@bar.com"),
            "email=foo@bar.com&uid=10&role=user"
        );
        assert_eq!(
            encode_profile("foo@bar.com&role=admin"),
            "email=foo@bar.comroleadmin&uid=10&role=user"
        );
        let oracle = ProfileOracle::random(&mut rand::thread_rng());
        let ct = oracle.profile_for(b"foo@bar.com&role=admin");
        assert_eq!(oracle.role_of(&ct), Ok("user".to_string()));
    }

    #[test]
    fn ctr_edit_oracle_edits() {
        let mut rng = rand::thread_rng();
        let pt = random_bytes(&mut rng, 40);
        let oracle = CtrEditOracle::random(&mut rng, &pt);
        let ct = oracle.ciphertext().to_vec();
        assert_eq!(ct.len(), 40);
        let edited = oracle.edit(&ct, 0, &pt[..10]).unwrap();
        assert_eq!(edited, ct);
    }

    #[test]
    fn mt_stream_oracle_prepends_prefix() {
        let oracle = MtStreamOracle::new(1234, vec![7; 5]);
        let ct = oracle.encrypt(b"AAAA");
        assert_eq!(mt_encrypt(&ct, 1234), b"\x07\x07\x07\x07\x07AAAA".to_vec());
    }
}
