//! Scheme parameters for the RLWE encryption engine
//!
//! The protocol layer never picks these directly: `pir::plan` chooses the
//! ring dimension and plaintext width, then asks the presets here for the
//! rest and for a noise estimate.

use serde::{Deserialize, Serialize};

use crate::math::{DEFAULT_Q, DEFAULT_SIGMA};

/// Smallest supported ring dimension. Only useful for tests; 2048 and up
/// are the realistic choices.
pub const MIN_RING_DIM: usize = 256;
/// Largest ring dimension `DEFAULT_Q` admits an NTT for.
pub const MAX_RING_DIM: usize = 8192;
/// Plaintext width bounds (bits per coefficient).
pub const MIN_PLAINTEXT_BITS: u32 = 4;
pub const MAX_PLAINTEXT_BITS: u32 = 30;
/// Key-switching gadget base 2^8.
pub const DEFAULT_GADGET_BASE: u64 = 1 << 8;
/// Headroom, in bits, between the noise estimate and the decryption ceiling.
/// The estimate is a standard deviation, so 4 bits is a 16σ tail.
pub const NOISE_MARGIN_BITS: f64 = 4.0;

/// Core cryptographic parameters of the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RlweParams {
    /// Ring dimension N (power of two), also the plaintext coefficient count
    pub ring_dim: usize,

    /// Ciphertext modulus q, NTT-friendly: q ≡ 1 (mod 2N)
    pub q: u64,

    /// Bits of payload per plaintext coefficient (logt)
    pub plaintext_bits: u32,

    /// Plaintext modulus t = 2^logt + 1. Odd, so powers of two invert mod t
    pub t: u64,

    /// Standard deviation for Gaussian error sampling
    pub sigma: f64,

    /// Gadget decomposition base z
    pub gadget_base: u64,

    /// Number of digits in gadget decomposition: ℓ = ⌈log_z(q)⌉
    pub gadget_len: usize,
}

impl RlweParams {
    /// Parameters for ring dimension `ring_dim` carrying `plaintext_bits`
    /// bits per coefficient, over `DEFAULT_Q`.
    pub fn new(ring_dim: usize, plaintext_bits: u32) -> Self {
        let q = DEFAULT_Q;
        let gadget_base = DEFAULT_GADGET_BASE;
        let gadget_len = Self::digits(q, gadget_base);

        Self {
            ring_dim,
            q,
            plaintext_bits,
            t: (1u64 << plaintext_bits) + 1,
            sigma: DEFAULT_SIGMA,
            gadget_base,
            gadget_len,
        }
    }

    fn digits(q: u64, base: u64) -> usize {
        let q_bits = 64 - q.leading_zeros();
        let base_bits = base.trailing_zeros();
        q_bits.div_ceil(base_bits) as usize
    }

    /// Scaling factor Δ = ⌊q/t⌋
    pub fn delta(&self) -> u64 {
        self.q / self.t
    }

    /// Bit length of q
    pub fn modulus_bits(&self) -> u32 {
        64 - self.q.leading_zeros()
    }

    /// Number of logt-bit chunks needed to carry one coefficient mod q
    pub fn chunks_per_coeff(&self) -> usize {
        self.modulus_bits().div_ceil(self.plaintext_bits) as usize
    }

    /// Plaintexts produced when one ciphertext is decomposed into
    /// logt-bit chunks (both polynomials)
    pub fn expansion_ratio(&self) -> usize {
        2 * self.chunks_per_coeff()
    }

    /// Decryption ceiling: log2(q / 2t). Noise must stay below this.
    pub fn noise_ceiling_bits(&self) -> f64 {
        (self.q as f64 / (2.0 * self.t as f64)).log2()
    }

    /// Standard deviation of the noise added by one key switch
    pub fn key_switch_noise(&self) -> f64 {
        let n = self.ring_dim as f64;
        let ell = self.gadget_len as f64;
        (ell * n / 3.0).sqrt() * self.gadget_base as f64 * self.sigma
    }

    /// Noise of one expanded selection ciphertext after `levels` doubling steps
    pub fn expansion_noise(&self, levels: u32) -> f64 {
        let fresh = self.sigma;
        let per_level = 2.0 * self.key_switch_noise();
        // 2^L · inv(2^L) leaves a multiple of q mod t behind, at most 2^L · t
        2f64.powi(levels as i32) * (fresh + per_level + self.t as f64)
    }

    /// log2 of the noise standard deviation in a reply ciphertext when the
    /// selection vectors were expanded over `levels` steps and the widest
    /// dimension has `max_dimension` entries.
    pub fn reply_noise_bits(&self, levels: u32, max_dimension: usize) -> f64 {
        let n = self.ring_dim as f64;
        let dot = (max_dimension as f64 * n / 3.0).sqrt() * self.t as f64;
        (dot * self.expansion_noise(levels)).log2()
    }

    /// Check if parameters are valid
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.ring_dim.is_power_of_two() {
            return Err("ring_dim must be a power of two");
        }
        if self.ring_dim < MIN_RING_DIM || self.ring_dim > MAX_RING_DIM {
            return Err("ring_dim outside supported range");
        }
        if self.q % (2 * self.ring_dim as u64) != 1 {
            return Err("q must be ≡ 1 (mod 2N) for NTT");
        }
        if self.plaintext_bits < MIN_PLAINTEXT_BITS || self.plaintext_bits > MAX_PLAINTEXT_BITS {
            return Err("plaintext_bits outside supported range");
        }
        if self.t != (1u64 << self.plaintext_bits) + 1 {
            return Err("t must equal 2^plaintext_bits + 1");
        }
        if !self.gadget_base.is_power_of_two() || self.gadget_base < 2 {
            return Err("gadget_base must be a power of two");
        }
        if self.gadget_len != Self::digits(self.q, self.gadget_base) {
            return Err("gadget_len must cover q");
        }
        if self.sigma.is_nan() || self.sigma <= 0.0 {
            return Err("sigma must be positive");
        }
        Ok(())
    }
}

impl Default for RlweParams {
    fn default() -> Self {
        Self::new(2048, 12)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        let params = RlweParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.t, 4097);
        assert_eq!(params.gadget_len, 8);
    }

    #[test]
    fn test_delta_and_chunks() {
        let params = RlweParams::new(2048, 12);
        // Δ ≈ 2^60 / 2^12 = 2^48
        assert!(params.delta() > (1 << 47));
        assert_eq!(params.modulus_bits(), 60);
        assert_eq!(params.chunks_per_coeff(), 5);
        assert_eq!(params.expansion_ratio(), 10);
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        let mut p = RlweParams::new(2048, 12);
        p.ring_dim = 3000;
        assert!(p.validate().is_err());

        let p = RlweParams::new(16384, 12);
        assert!(p.validate().is_err());

        let p = RlweParams::new(2048, 2);
        assert!(p.validate().is_err());

        let mut p = RlweParams::new(2048, 12);
        p.t = 4096;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_noise_grows_with_levels_and_width() {
        let p = RlweParams::new(2048, 12);
        assert!(p.reply_noise_bits(6, 21) < p.reply_noise_bits(7, 21));
        assert!(p.reply_noise_bits(6, 21) < p.reply_noise_bits(6, 400));
    }

    #[test]
    fn test_two_dimensional_default_fits_budget() {
        // 4096 items of 288 bytes: dims [21, 20], 41 slots, 6 levels
        let p = RlweParams::new(2048, 12);
        assert!(p.reply_noise_bits(6, 21) + NOISE_MARGIN_BITS <= p.noise_ceiling_bits());
    }

    #[test]
    fn test_wide_plaintexts_exhaust_budget() {
        let p = RlweParams::new(2048, 20);
        assert!(p.reply_noise_bits(5, 16) + NOISE_MARGIN_BITS > p.noise_ceiling_bits());
    }
}
