//! RLWE encryption and decryption
//!
//! Implements encryption: b = -a·s + e + Δ·m
//! where Δ = ⌊q/t⌋ is the scaling factor.

use crate::math::{GaussianSampler, ModQ, NttContext, Poly};
use crate::params::RlweParams;

use super::types::{RlweCiphertext, RlweSecretKey};

impl RlweSecretKey {
    /// Generate a secret key from Gaussian distribution
    pub fn generate(params: &RlweParams, sampler: &mut GaussianSampler) -> Self {
        let poly = Poly::sample_gaussian(params.ring_dim, params.q, sampler);
        Self { poly }
    }
}

impl RlweCiphertext {
    /// Encrypt a message polynomial
    ///
    /// Computes: (a, b) where b = -a·s + e + Δ·m
    ///
    /// # Arguments
    /// * `sk` - Secret key
    /// * `message_poly` - Message polynomial (coefficients in [0, t))
    /// * `delta` - Scaling factor Δ = ⌊q/t⌋
    /// * `a_random` - Uniform polynomial a ∈ R_q
    /// * `error` - Error polynomial e sampled from Gaussian
    /// * `ctx` - NTT context for polynomial multiplication
    pub fn encrypt(
        sk: &RlweSecretKey,
        message_poly: &Poly,
        delta: u64,
        a_random: Poly,
        error: &Poly,
        ctx: &NttContext,
    ) -> Self {
        let scaled_msg = message_poly.scalar_mul(delta);
        let neg_a_s = -a_random.mul_ntt(&sk.poly, ctx);
        let b = &(&neg_a_s + error) + &scaled_msg;

        Self { a: a_random, b }
    }

    /// Decrypt ciphertext to its plaintext coefficients in [0, t)
    ///
    /// Computes: m = ⌊t·(b + a·s) / q⌉ mod t
    pub fn decrypt(&self, sk: &RlweSecretKey, t: u64, ctx: &NttContext) -> Vec<u64> {
        let q = self.modulus() as u128;
        let noisy = &self.a.mul_ntt(&sk.poly, ctx) + &self.b;

        noisy
            .coeffs()
            .iter()
            .map(|&v| {
                let scaled = (t as u128 * v as u128 + q / 2) / q;
                (scaled % t as u128) as u64
            })
            .collect()
    }

    /// Decryption noise: the centered distance of b + a·s from Δ·m.
    ///
    /// Test and diagnostics helper; needs the expected message.
    pub fn noise(&self, sk: &RlweSecretKey, message: &[u64], delta: u64, ctx: &NttContext) -> u64 {
        let q = self.modulus();
        let noisy = &self.a.mul_ntt(&sk.poly, ctx) + &self.b;
        noisy
            .coeffs()
            .iter()
            .zip(message)
            .map(|(&v, &m)| {
                let diff = ModQ::sub(v, ModQ::mul(m, delta, q), q);
                diff.min(q - diff)
            })
            .max()
            .unwrap_or(0)
    }

    /// The all-zero ciphertext in the NTT domain, an accumulator seed
    pub fn zero_ntt(ring_dim: usize, q: u64, ctx: &NttContext) -> Self {
        let zero = Poly::zero(ring_dim, q).to_ntt_new(ctx);
        Self {
            a: zero.clone(),
            b: zero,
        }
    }

    /// Homomorphic addition of two ciphertexts
    pub fn add(&self, other: &RlweCiphertext) -> RlweCiphertext {
        RlweCiphertext {
            a: &self.a + &other.a,
            b: &self.b + &other.b,
        }
    }

    /// Multiply both components by X^k (k in [0, 2N))
    pub fn mul_monomial(&self, k: usize) -> RlweCiphertext {
        RlweCiphertext {
            a: self.a.mul_monomial(k),
            b: self.b.mul_monomial(k),
        }
    }

    /// Move both components to the NTT domain
    pub fn to_ntt(&mut self, ctx: &NttContext) {
        self.a.to_ntt(ctx);
        self.b.to_ntt(ctx);
    }

    /// Move both components back to the coefficient domain
    pub fn from_ntt(&mut self, ctx: &NttContext) {
        self.a.from_ntt(ctx);
        self.b.from_ntt(ctx);
    }

    /// Multiply-accumulate by a plaintext in the NTT domain:
    /// self += ct · p(X). Decrypts to the running Σ p_j(X)·m_j(X).
    pub fn mul_plain_acc(&mut self, ct: &RlweCiphertext, plaintext: &Poly, ctx: &NttContext) {
        self.a.mul_acc_ntt_domain(&ct.a, plaintext, ctx);
        self.b.mul_acc_ntt_domain(&ct.b, plaintext, ctx);
    }
}
