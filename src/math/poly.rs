//! Polynomial operations over R_q = Z_q[X]/(X^N + 1).
//!
//! Polynomials live either in the coefficient domain or in the NTT domain.
//! Additions work in both domains; products go through the NTT.
//!
//! # Example
//!
//! ```
//! use sealpir::math::{NttContext, Poly, DEFAULT_Q};
//!
//! let ctx = NttContext::with_default_q(256);
//! let mut x = Poly::zero(256, DEFAULT_Q);
//! x.set_coeff(1, 1);
//!
//! // X · X^255 = X^256 = -1
//! let y = x.mul_monomial(255);
//! assert_eq!(y.coeff(0), DEFAULT_Q - 1);
//! assert_eq!(x.mul_ntt(&x.mul_monomial(254), &ctx), y);
//! ```

use super::modular::ModQ;
use super::ntt::NttContext;
use super::sampler::GaussianSampler;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Polynomial in R_q = Z_q[X]/(X^N + 1).
///
/// # Fields
///
/// * `coeffs` - Coefficients in coefficient or NTT domain
/// * `q` - Modulus q
/// * `is_ntt` - Whether coefficients are in NTT domain
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Poly {
    coeffs: Vec<u64>,
    q: u64,
    is_ntt: bool,
}

impl Poly {
    /// Create zero polynomial with given dimension and modulus
    pub fn zero(dim: usize, q: u64) -> Self {
        Self {
            coeffs: vec![0; dim],
            q,
            is_ntt: false,
        }
    }

    /// Create polynomial from coefficient vector, reducing modulo q
    pub fn from_coeffs(coeffs: Vec<u64>, q: u64) -> Self {
        let mut p = Self {
            coeffs,
            q,
            is_ntt: false,
        };
        for c in &mut p.coeffs {
            *c %= q;
        }
        p
    }

    /// Sample polynomial with coefficients from discrete Gaussian distribution
    pub fn sample_gaussian(dim: usize, q: u64, sampler: &mut GaussianSampler) -> Self {
        Self {
            coeffs: sampler.sample_vec_centered(dim, q),
            q,
            is_ntt: false,
        }
    }

    /// Sample a uniformly random polynomial
    pub fn uniform(dim: usize, q: u64, sampler: &mut GaussianSampler) -> Self {
        Self {
            coeffs: sampler.uniform_vec(dim, q),
            q,
            is_ntt: false,
        }
    }

    /// Get polynomial dimension
    pub fn dimension(&self) -> usize {
        self.coeffs.len()
    }

    /// Get modulus
    pub fn modulus(&self) -> u64 {
        self.q
    }

    /// Check if in NTT domain
    pub fn is_ntt(&self) -> bool {
        self.is_ntt
    }

    /// Get coefficient at index (only valid if not in NTT domain)
    pub fn coeff(&self, i: usize) -> u64 {
        assert!(!self.is_ntt, "Cannot access coefficients in NTT domain");
        self.coeffs[i]
    }

    /// Set coefficient at index (only valid if not in NTT domain)
    pub fn set_coeff(&mut self, i: usize, value: u64) {
        assert!(!self.is_ntt, "Cannot set coefficients in NTT domain");
        self.coeffs[i] = value % self.q;
    }

    /// Coefficient (or NTT evaluation) vector
    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    /// Convert to NTT domain
    pub fn to_ntt(&mut self, ctx: &NttContext) {
        if !self.is_ntt {
            ctx.forward(&mut self.coeffs);
            self.is_ntt = true;
        }
    }

    /// Convert from NTT domain to coefficient domain
    pub fn from_ntt(&mut self, ctx: &NttContext) {
        if self.is_ntt {
            ctx.inverse(&mut self.coeffs);
            self.is_ntt = false;
        }
    }

    /// Create a copy in NTT domain
    pub fn to_ntt_new(&self, ctx: &NttContext) -> Self {
        let mut result = self.clone();
        result.to_ntt(ctx);
        result
    }

    /// Scalar multiplication (valid in either domain)
    pub fn scalar_mul(&self, scalar: u64) -> Self {
        let scalar = scalar % self.q;
        Self {
            coeffs: self
                .coeffs
                .iter()
                .map(|&c| ModQ::mul(c, scalar, self.q))
                .collect(),
            q: self.q,
            is_ntt: self.is_ntt,
        }
    }

    /// Multiply by the monomial X^k for k in [0, 2N).
    ///
    /// This is a signed rotation: X^N = -1, so exponents past N wrap with a
    /// sign flip. Multiplying by X^(2N - k) is multiplication by X^(-k).
    pub fn mul_monomial(&self, k: usize) -> Self {
        assert!(!self.is_ntt, "Monomial rotation needs coefficient domain");
        let n = self.coeffs.len();
        let k = k % (2 * n);
        let mut out = vec![0u64; n];
        for (i, &c) in self.coeffs.iter().enumerate() {
            let idx = (i + k) % (2 * n);
            if idx < n {
                out[idx] = c;
            } else {
                out[idx - n] = ModQ::negate(c, self.q);
            }
        }
        Self {
            coeffs: out,
            q: self.q,
            is_ntt: false,
        }
    }

    /// Polynomial multiplication using NTT (negacyclic for X^N + 1)
    pub fn mul_ntt(&self, other: &Self, ctx: &NttContext) -> Self {
        assert_eq!(self.q, other.q, "Moduli must match");
        assert_eq!(self.coeffs.len(), other.coeffs.len(), "Dimensions must match");

        let a = self.to_ntt_new(ctx);
        let b = other.to_ntt_new(ctx);

        let mut poly = a.mul_ntt_domain(&b, ctx);
        poly.from_ntt(ctx);
        poly
    }

    /// Polynomial multiplication when both are already in NTT domain
    pub fn mul_ntt_domain(&self, other: &Self, ctx: &NttContext) -> Self {
        assert!(
            self.is_ntt && other.is_ntt,
            "Both polynomials must be in NTT domain"
        );
        let mut result = vec![0u64; self.coeffs.len()];
        ctx.pointwise_mul(&self.coeffs, &other.coeffs, &mut result);
        Self {
            coeffs: result,
            q: self.q,
            is_ntt: true,
        }
    }

    /// In-place multiply-accumulate in NTT domain: self += a * b
    pub fn mul_acc_ntt_domain(&mut self, a: &Self, b: &Self, ctx: &NttContext) {
        assert!(
            self.is_ntt && a.is_ntt && b.is_ntt,
            "All polynomials must be in NTT domain"
        );
        ctx.pointwise_mul_acc(&mut self.coeffs, &a.coeffs, &b.coeffs);
    }

    /// Check if polynomial is zero
    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }

    /// L-infinity norm in the centered representation
    pub fn linf_norm(&self) -> u64 {
        assert!(!self.is_ntt, "Cannot compute norm in NTT domain");
        self.coeffs
            .iter()
            .map(|&c| if c <= self.q / 2 { c } else { self.q - c })
            .max()
            .unwrap_or(0)
    }
}

impl Add for &Poly {
    type Output = Poly;

    fn add(self, rhs: Self) -> Self::Output {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl AddAssign<&Poly> for Poly {
    fn add_assign(&mut self, rhs: &Self) {
        assert_eq!(self.q, rhs.q, "Moduli must match");
        assert_eq!(self.is_ntt, rhs.is_ntt, "NTT domains must match");
        let q = self.q;
        for (a, &b) in self.coeffs.iter_mut().zip(rhs.coeffs.iter()) {
            let sum = *a + b;
            *a = if sum >= q { sum - q } else { sum };
        }
    }
}

impl Sub for &Poly {
    type Output = Poly;

    fn sub(self, rhs: Self) -> Self::Output {
        let mut out = self.clone();
        out -= rhs;
        out
    }
}

impl SubAssign<&Poly> for Poly {
    fn sub_assign(&mut self, rhs: &Self) {
        assert_eq!(self.q, rhs.q, "Moduli must match");
        assert_eq!(self.is_ntt, rhs.is_ntt, "NTT domains must match");
        let q = self.q;
        for (a, &b) in self.coeffs.iter_mut().zip(rhs.coeffs.iter()) {
            *a = if *a >= b { *a - b } else { q - b + *a };
        }
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Self::Output {
        Poly {
            coeffs: self
                .coeffs
                .iter()
                .map(|&c| ModQ::negate(c, self.q))
                .collect(),
            q: self.q,
            is_ntt: self.is_ntt,
        }
    }
}

impl Neg for Poly {
    type Output = Poly;

    fn neg(self) -> Self::Output {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::DEFAULT_Q;

    fn make_ctx(n: usize) -> NttContext {
        NttContext::with_default_q(n)
    }

    #[test]
    fn test_add_sub_neg() {
        let q = DEFAULT_Q;
        let a = Poly::from_coeffs(vec![5, 6, 7, 8], q);
        let b = Poly::from_coeffs(vec![10, 20, 30, 40], q);

        let sum = &a + &b;
        assert_eq!(sum.coeffs(), &[15, 26, 37, 48]);

        let diff = &a - &b;
        assert_eq!(diff.coeff(0), q - 5);
        assert_eq!(diff.coeff(3), q - 32);

        assert!((&a + &(-&a)).is_zero());
    }

    #[test]
    fn test_poly_mul_ntt_simple() {
        let n = 256;
        let ctx = make_ctx(n);

        // (1 + x)^2 = 1 + 2x + x^2
        let mut coeffs = vec![0u64; n];
        coeffs[0] = 1;
        coeffs[1] = 1;
        let a = Poly::from_coeffs(coeffs, DEFAULT_Q);

        let result = a.mul_ntt(&a, &ctx);
        assert_eq!(&result.coeffs()[..3], &[1, 2, 1]);
        assert!(result.coeffs()[3..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_mul_monomial_matches_ntt_product() {
        let n = 256;
        let ctx = make_ctx(n);
        let a = Poly::from_coeffs((0..n as u64).map(|i| i * 31 + 7).collect(), DEFAULT_Q);

        for k in [0, 1, 17, n - 1, n, n + 5, 2 * n - 1] {
            // X^k as a polynomial
            let mut mono = Poly::zero(n, DEFAULT_Q);
            if k < n {
                mono.set_coeff(k, 1);
            } else {
                mono.set_coeff(k - n, DEFAULT_Q - 1);
            }
            assert_eq!(a.mul_monomial(k), a.mul_ntt(&mono, &ctx), "k = {}", k);
        }
    }

    #[test]
    fn test_mul_monomial_inverse() {
        let n = 64;
        let a = Poly::from_coeffs((0..n as u64).collect(), DEFAULT_Q);
        // X^k · X^(-k) = 1
        for k in [1, 8, 32] {
            assert_eq!(a.mul_monomial(k).mul_monomial(2 * n - k), a);
        }
    }

    #[test]
    fn test_mul_acc_ntt_domain() {
        let n = 256;
        let ctx = make_ctx(n);
        let a = Poly::from_coeffs((0..n as u64).map(|i| i % 100).collect(), DEFAULT_Q);
        let b = Poly::from_coeffs((0..n as u64).map(|i| (i * 7) % 100).collect(), DEFAULT_Q);
        let c = Poly::from_coeffs((0..n as u64).map(|i| (i * 13) % 100).collect(), DEFAULT_Q);

        let expected = &a.mul_ntt(&b, &ctx) + &a.mul_ntt(&c, &ctx);

        let a_ntt = a.to_ntt_new(&ctx);
        let mut acc = Poly::zero(n, DEFAULT_Q).to_ntt_new(&ctx);
        acc.mul_acc_ntt_domain(&a_ntt, &b.to_ntt_new(&ctx), &ctx);
        acc.mul_acc_ntt_domain(&a_ntt, &c.to_ntt_new(&ctx), &ctx);
        acc.from_ntt(&ctx);

        assert_eq!(acc, expected);
    }

    #[test]
    fn test_linf_norm() {
        let q = DEFAULT_Q;
        let p = Poly::from_coeffs(vec![100, q - 50, 0, 3], q);
        assert_eq!(p.linf_norm(), 100);
    }
}
