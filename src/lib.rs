//! Block cipher modes built on an opaque block primitive, the classic attacks
//! on their misuse, and an exact MT19937 with state recovery.
//!
//! Nothing here is constant time or meant to protect real data.

pub mod bitflip;
pub mod block;
pub mod cbc;
pub mod cipher;
pub mod ctr;
pub mod ecb;
pub mod encode;
pub mod error;
pub mod mersenne;
pub mod oracle;
pub mod stream;
pub mod xor;

pub use error::{Error, Result};
