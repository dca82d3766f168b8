//! PCG32 (PCG-XSH-RR) source for candidate poses.
//!
//! A sampling request carries one `seed`. Each rayon worker gets its own
//! generator on stream `i` of that seed via [`Pcg32::for_worker`], so
//! workers never share state and their draws do not overlap. The serial
//! driver is worker 0. A given `(seed, num_workers)` therefore always
//! reproduces the same accepted poses in the same order.

const MULTIPLIER: u64 = 6_364_136_223_846_793_005;

#[derive(Debug, Clone)]
pub struct Pcg32 {
    state: u64,
    inc: u64,
}

impl Pcg32 {
    pub fn new(seed: u64, stream: u64) -> Self {
        let inc = (stream << 1) | 1;
        let mut rng = Pcg32 { state: 0, inc };
        rng.advance();
        rng.state = rng.state.wrapping_add(seed);
        rng.advance();
        rng
    }

    /// Generator for parallel worker `worker` of a request seeded with
    /// `seed`.
    pub fn for_worker(seed: u64, worker: u32) -> Self {
        Self::new(seed, u64::from(worker))
    }

    fn advance(&mut self) {
        self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(self.inc);
    }

    pub fn next_u32(&mut self) -> u32 {
        let old = self.state;
        self.advance();
        let xorshifted = (((old >> 18) ^ old) >> 27) as u32;
        let rot = (old >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_float(&mut self) -> f64 {
        self.next_u32() as f64 / (u32::MAX as f64 + 1.0)
    }

    /// Uniform float in `[lo, hi)`. A degenerate range returns `lo`.
    pub fn next_range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_float() * (hi - lo)
    }
}
