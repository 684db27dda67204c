use std::f64::consts::TAU;

use rand::{distributions::Distribution, Error, Rng, RngCore, SeedableRng};

/// Weyl increment applied to the state before every draw.
const STATE_INCREMENT: u32 = 0x6D2B_79F5;
/// 2^32, maps a `u32` onto [0, 1).
const U32_SCALE: f64 = 4_294_967_296.0;
/// Bounds applied to the radius uniform before taking its logarithm.
const RADIUS_UNIFORM_MIN: f64 = 1e-4;
const RADIUS_UNIFORM_MAX: f64 = 0.9999;

/// Mulberry32: 32-bit state, wrapping arithmetic, xor-shift/odd-multiplier mixing.
///
/// Not cryptographically secure. Two generators built from the same seed
/// produce bit-identical streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    /// Creates a generator from an integer seed.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next uniform draw in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        unit_uniform(self)
    }
}

impl RngCore for Mulberry32 {
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(STATE_INCREMENT);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    fn next_u64(&mut self) -> u64 {
        let low = u64::from(self.next_u32());
        let high = u64::from(self.next_u32());
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Mulberry32 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }

    /// Keeps the low 32 bits so `seed_from_u64(s)` matches `new(s as u32)`.
    #[allow(clippy::cast_possible_truncation)]
    fn seed_from_u64(state: u64) -> Self {
        Self::new((state & u64::from(u32::MAX)) as u32)
    }
}

/// Uniform in [0, 1) from exactly one `u32` draw.
pub fn unit_uniform<R: RngCore + ?Sized>(rng: &mut R) -> f64 {
    f64::from(rng.next_u32()) / U32_SCALE
}

/// Approximately standard-normal sampler (Box-Muller, cosine branch only).
///
/// Every sample consumes exactly two uniforms: the first feeds the radius
/// `sqrt(-2 ln u1)` after being clamped into [1e-4, 0.9999], the second the
/// angle `cos(2π u2)`. The draw order is part of the reproducibility contract
/// of the data generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalSampler;

impl Distribution<f64> for NormalSampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let radius_draw = unit_uniform(rng).clamp(RADIUS_UNIFORM_MIN, RADIUS_UNIFORM_MAX);
        let angle_draw = unit_uniform(rng);
        (-2.0 * radius_draw.ln()).sqrt() * (TAU * angle_draw).cos()
    }
}

/// Shorthand for `rng.sample(NormalSampler)`.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    NormalSampler.sample(rng)
}
