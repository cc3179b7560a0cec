use crate::error::{Error, Result};
use rand::RngCore;
use rayon::prelude::*;
use tracing::{debug, warn};

pub const N: usize = 624;

pub const DEFAULT_SEED: u32 = 5489;

// word size is always 32
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    pub m: usize,
    pub r: u32,
    pub a: u32,
    pub u: u32,
    pub d: u32,
    pub s: u32,
    pub b: u32,
    pub t: u32,
    pub c: u32,
    pub l: u32,
    pub f: u32,
}

pub const MT19937: Params = Params {
    m: 397,
    r: 31,
    a: 0x9908B0DF,
    u: 11,
    d: 0xFFFFFFFF,
    s: 7,
    b: 0x9D2C5680,
    t: 15,
    c: 0xEFC60000,
    l: 18,
    f: 1812433253,
};

impl Params {
    pub fn temper(&self, mut y: u32) -> u32 {
        y ^= (y >> self.u) & self.d;
        y ^= (y << self.s) & self.b;
        y ^= (y << self.t) & self.c;
        y ^= y >> self.l;
        y
    }

    pub fn untemper(&self, mut y: u32) -> u32 {
        y = undo_shr_xor(y, self.l, u32::MAX);
        y = undo_shl_xor(y, self.t, self.c);
        y = undo_shl_xor(y, self.s, self.b);
        undo_shr_xor(y, self.u, self.d)
    }
}

// inverts y = x ^ ((x >> n) & mask), top bit first
fn undo_shr_xor(y: u32, n: u32, mask: u32) -> u32 {
    let mut x = y;
    for i in (0..32u32.saturating_sub(n)).rev() {
        x ^= (x >> n) & mask & (1 << i);
    }
    x
}

// inverts y = x ^ ((x << n) & mask), bottom bit first
fn undo_shl_xor(y: u32, n: u32, mask: u32) -> u32 {
    let mut x = y;
    for i in n..32 {
        x ^= (x << n) & mask & (1 << i);
    }
    x
}

#[derive(Clone)]
pub struct Mt19937 {
    params: Params,
    state: [u32; N],
    index: usize,
    seeded: bool,
}

impl Mt19937 {
    pub fn new() -> Self {
        Self::with_params(MT19937)
    }

    pub fn with_params(params: Params) -> Self {
        Mt19937 {
            params,
            state: [0; N],
            index: N,
            seeded: false,
        }
    }

    pub fn from_seed(seed: u32) -> Self {
        let mut mt = Self::new();
        mt.seed(seed);
        mt
    }

    pub fn seed(&mut self, seed: u32) {
        let f = self.params.f;
        self.state[0] = seed;
        for i in 1..N {
            let prev = self.state[i - 1];
            self.state[i] = f.wrapping_mul(prev ^ (prev >> 30)).wrapping_add(i as u32);
        }
        self.index = N;
        self.seeded = true;
    }

    pub fn from_state(params: Params, state: [u32; N]) -> Self {
        Mt19937 {
            params,
            state,
            index: N,
            seeded: true,
        }
    }

    /// Clones a generator from `N` consecutive outputs taken right after a
    /// twist. The clone's next output equals the original's next output.
    pub fn clone_from_outputs(params: Params, outputs: &[u32]) -> Result<Self> {
        if outputs.len() != N {
            return Err(Error::LengthMismatch {
                left: outputs.len(),
                right: N,
            });
        }
        let mut state = [0u32; N];
        for (s, &y) in state.iter_mut().zip(outputs) {
            *s = params.untemper(y);
        }
        Ok(Self::from_state(params, state))
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    // slot i reads slot i + m after the wrap has rewritten it
    pub fn twist(&mut self) {
        let Params { m, r, a, .. } = self.params;
        let lower = (1u32 << r) - 1;
        let upper = !lower;
        for i in 0..N {
            let x = (self.state[i] & upper) | (self.state[(i + 1) % N] & lower);
            let mut xa = x >> 1;
            if x & 1 != 0 {
                xa ^= a;
            }
            self.state[i] = self.state[(i + m) % N] ^ xa;
        }
        self.index = 0;
    }

    pub fn try_next_u32(&mut self) -> Result<u32> {
        if !self.seeded {
            return Err(Error::UnseededGenerator);
        }
        if self.index >= N {
            self.twist();
        }
        let y = self.state[self.index];
        self.index += 1;
        Ok(self.params.temper(y))
    }

    /// Seeds with [`DEFAULT_SEED`] and warns if the generator was never seeded.
    pub fn next_u32(&mut self) -> u32 {
        if !self.seeded {
            warn!(
                seed = DEFAULT_SEED,
                "twister used before seeding, falling back to default seed"
            );
            self.seed(DEFAULT_SEED);
        }
        match self.try_next_u32() {
            Ok(y) => y,
            Err(_) => unreachable!("generator is seeded"),
        }
    }
}

impl Default for Mt19937 {
    fn default() -> Self {
        Self::new()
    }
}

impl RngCore for Mt19937 {
    fn next_u32(&mut self) -> u32 {
        Mt19937::next_u32(self)
    }

    fn next_u64(&mut self) -> u64 {
        let lo = Mt19937::next_u32(self) as u64;
        let hi = Mt19937::next_u32(self) as u64;
        hi << 32 | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chk in dest.chunks_mut(4) {
            let word = Mt19937::next_u32(self).to_le_bytes();
            chk.copy_from_slice(&word[..chk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Timestamp seed behind a first output, searching `window` seconds back
/// from `now`. The latest match wins.
pub fn crack_time_seed(output: u32, now: u32, window: u32) -> Result<u32> {
    let earliest = now.saturating_sub(window);
    let seed = (earliest..=now)
        .into_par_iter()
        .find_last(|&seed| Mt19937::from_seed(seed).next_u32() == output)
        .ok_or(Error::BruteForceExhausted)?;
    debug!(seed, age = now - seed, "recovered time seed");
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn seeding_works() {
        let mt = Mt19937::from_seed(0);
        assert_eq!(mt.index, N);
        assert_eq!(&mt.state[0..5], &[0, 1, 1812433255, 1900727105, 1208447044]);
    }

    #[test]
    fn seed_zero_matches_reference() {
        let mut mt = Mt19937::from_seed(0);
        assert_eq!(mt.next_u32(), 2357136044);
        assert_eq!(mt.index, 1);
    }

    #[test]
    fn default_seed_matches_reference() {
        let mut mt = Mt19937::from_seed(DEFAULT_SEED);
        assert_eq!(mt.next_u32(), 3499211612);
        // the standard's 10000th output
        let last = (1..10000).map(|_| mt.next_u32()).last();
        assert_eq!(last, Some(4123659995));
    }

    #[test]
    fn known_outputs() {
        let mut mt = Mt19937::from_seed(17);
        let arr: Vec<_> = (0..3).map(|_| mt.next_u32()).collect();
        assert_eq!(&arr, &[1265576559, 780729585, 2278852751]);
    }

    #[test]
    fn unseeded_generator() {
        let mut mt = Mt19937::new();
        assert_eq!(mt.try_next_u32(), Err(Error::UnseededGenerator));
        assert_eq!(mt.next_u32(), 3499211612);
        assert!(mt.try_next_u32().is_ok());
    }

    #[test]
    fn twist_runs_every_n_outputs() {
        let mut mt = Mt19937::from_seed(1);
        for _ in 0..N {
            mt.next_u32();
        }
        assert_eq!(mt.index, N);
        mt.next_u32();
        assert_eq!(mt.index, 1);
    }

    #[test]
    fn undo_shifts_work() {
        let mut rng = rand::thread_rng();
        for _ in 0..10000 {
            let x: u32 = rng.gen();
            assert_eq!(undo_shl_xor(x ^ ((x << 7) & 0x9D2C5680), 7, 0x9D2C5680), x);
            assert_eq!(undo_shl_xor(x ^ ((x << 15) & 0xEFC60000), 15, 0xEFC60000), x);
            assert_eq!(undo_shr_xor(x ^ (x >> 11), 11, u32::MAX), x);
            assert_eq!(undo_shr_xor(x ^ (x >> 18), 18, u32::MAX), x);
        }
    }

    #[test]
    fn untemper_inverts_temper() {
        let mut rng = rand::thread_rng();
        for _ in 0..10000 {
            let x: u32 = rng.gen();
            assert_eq!(MT19937.untemper(MT19937.temper(x)), x);
        }
    }

    #[test]
    fn untempering_recovers_state() {
        let mut mt = Mt19937::from_seed(rand::thread_rng().gen());
        let outputs: Vec<_> = (0..N).map(|_| mt.next_u32()).collect();
        let state: Vec<_> = outputs.iter().map(|&y| MT19937.untemper(y)).collect();
        assert_eq!(&state[..], &mt.state[..]);
    }

    #[test]
    fn clone_matches_original() {
        let mut rng = rand::thread_rng();
        let mut mt = Mt19937::from_seed(rng.gen());
        let outputs: Vec<_> = (0..N).map(|_| mt.next_u32()).collect();
        let mut clone = Mt19937::clone_from_outputs(MT19937, &outputs).unwrap();
        for _ in 0..3 * N {
            assert_eq!(clone.next_u32(), mt.next_u32());
        }
    }

    #[test]
    fn clone_needs_a_full_state() {
        let res = Mt19937::clone_from_outputs(MT19937, &[1, 2, 3]);
        assert!(matches!(res, Err(Error::LengthMismatch { left: 3, right: N })));
    }

    #[test]
    fn works_as_a_rand_rng() {
        let mut a = Mt19937::from_seed(42);
        let mut b = Mt19937::from_seed(42);
        let x: u8 = a.gen_range(10..20);
        assert!((10..20).contains(&x));
        let mut buf = [0u8; 7];
        b.fill_bytes(&mut buf);
        let mut c = Mt19937::from_seed(42);
        let first = Mt19937::next_u32(&mut c).to_le_bytes();
        assert_eq!(buf[..4], first);
    }

    #[test]
    fn crack_time_seed_works() {
        let mut rng = rand::thread_rng();
        let now: u32 = 1_700_000_000;
        let seeded_at = now - rng.gen_range(40..=1000);
        let output = Mt19937::from_seed(seeded_at).next_u32();
        assert_eq!(crack_time_seed(output, now, 2000), Ok(seeded_at));
        assert_eq!(
            crack_time_seed(output, seeded_at - 1, 100),
            Err(Error::BruteForceExhausted)
        );
    }

    #[test]
    fn crack_time_seed_at_window_edges() {
        let now: u32 = 1_700_000_000;
        let output = Mt19937::from_seed(now).next_u32();
        assert_eq!(crack_time_seed(output, now, 0), Ok(now));
        let output = Mt19937::from_seed(now - 500).next_u32();
        assert_eq!(crack_time_seed(output, now, 500), Ok(now - 500));
        let output = Mt19937::from_seed(5).next_u32();
        assert_eq!(crack_time_seed(output, 10, 1000), Ok(5));
    }
}
