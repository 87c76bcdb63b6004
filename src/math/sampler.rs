//! Randomness for key generation and encryption
//!
//! One ChaCha20 stream drives both the discrete Gaussian error samples and
//! the uniform `a` polynomials, so a seeded sampler reproduces a whole
//! client session bit for bit.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Default Gaussian standard deviation
pub const DEFAULT_SIGMA: f64 = 3.2;

/// Discrete Gaussian sampler over Z using rejection sampling
#[derive(Clone)]
pub struct GaussianSampler {
    /// Standard deviation σ
    sigma: f64,
    /// Reject samples beyond this many units from zero
    tailcut: i64,
    rng: ChaCha20Rng,
}

impl GaussianSampler {
    /// Create a sampler seeded from operating system entropy
    pub fn new(sigma: f64) -> Self {
        Self::from_rng(sigma, ChaCha20Rng::from_entropy())
    }

    /// Create a deterministic sampler from a 64-bit seed
    pub fn with_seed(sigma: f64, seed: u64) -> Self {
        Self::from_rng(sigma, ChaCha20Rng::seed_from_u64(seed))
    }

    /// Create a deterministic sampler from a 32-byte seed
    pub fn from_seed(sigma: f64, seed: [u8; 32]) -> Self {
        Self::from_rng(sigma, ChaCha20Rng::from_seed(seed))
    }

    fn from_rng(sigma: f64, rng: ChaCha20Rng) -> Self {
        Self {
            sigma,
            tailcut: (sigma * 6.0).ceil() as i64,
            rng,
        }
    }

    /// Get the standard deviation
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Sample a single value from the discrete Gaussian D_σ
    pub fn sample(&mut self) -> i64 {
        let sigma_sq_2 = 2.0 * self.sigma * self.sigma;
        let bound = self.tailcut;

        loop {
            let x = self.rng.gen_range(-bound..=bound);
            // Accept with probability exp(-x²/(2σ²))
            let prob = (-((x * x) as f64) / sigma_sq_2).exp();
            let u: f64 = self.rng.gen();
            if u < prob {
                return x;
            }
        }
    }

    /// Sample `len` Gaussian values mapped into Z_q
    pub fn sample_vec_centered(&mut self, len: usize, q: u64) -> Vec<u64> {
        (0..len)
            .map(|_| {
                let s = self.sample();
                if s >= 0 {
                    s as u64
                } else {
                    q - s.unsigned_abs()
                }
            })
            .collect()
    }

    /// Sample `len` values uniformly from [0, q)
    pub fn uniform_vec(&mut self, len: usize, q: u64) -> Vec<u64> {
        (0..len).map(|_| self.rng.gen_range(0..q)).collect()
    }
}

impl std::fmt::Debug for GaussianSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaussianSampler")
            .field("sigma", &self.sigma)
            .field("tailcut", &self.tailcut)
            .finish()
    }
}
