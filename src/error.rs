use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid pkcs#7 padding")]
    InvalidPadding,

    #[error("length mismatch: {left} vs {right} bytes")]
    LengthMismatch { left: usize, right: usize },

    #[error("{len} bytes is not a multiple of the {block_size} byte block size")]
    NotBlockAligned { len: usize, block_size: usize },

    #[error("search space exhausted without a match")]
    BruteForceExhausted,

    #[error("generator was never seeded")]
    UnseededGenerator,

    #[error("oracle output shows no repeated blocks, not ECB")]
    NotEcb,

    #[error("calibration failed: {0}")]
    Calibration(&'static str),

    /// Raised by receivers that reject high-ASCII plaintext. Carries the
    /// decrypted bytes, which is exactly the leak the key-as-IV attack uses.
    #[error("plaintext is not ascii")]
    NonAscii(Vec<u8>),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid base64: {0}")]
    InvalidBase64(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
