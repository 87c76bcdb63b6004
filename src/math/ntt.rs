//! Number-Theoretic Transform (NTT) for fast polynomial multiplication.
//!
//! Implements Cooley-Tukey radix-2 NTT for negacyclic convolution over
//! R_q = Z_q[X]/(X^N + 1).
//!
//! # Theory
//!
//! For negacyclic convolution (multiplication modulo X^N + 1), we use a
//! primitive 2N-th root of unity ψ where ψ^N = -1. The NTT evaluates a
//! polynomial at odd powers of ψ, enabling pointwise multiplication in the
//! evaluation domain.
//!
//! # Requirements
//!
//! The modulus q must satisfy q ≡ 1 (mod 2N). `DEFAULT_Q` satisfies this for
//! every N up to 8192.
//!
//! Values in the NTT domain are kept in Montgomery form; `forward` and
//! `inverse` convert on the way in and out.

/// Default ciphertext modulus q = 2^60 - 2^14 + 1 (NTT-friendly prime).
pub const DEFAULT_Q: u64 = 1152921504606830593;

/// Precomputed NTT context with twiddle factors.
///
/// Create once per (N, q) pair and reuse for all polynomial operations.
/// The context is immutable, so one instance can be shared across threads.
#[derive(Clone, Debug)]
pub struct NttContext {
    /// Ring dimension (power of two).
    n: usize,
    /// Modulus.
    q: u64,
    /// -q^(-1) mod 2^64.
    q_inv_neg: u64,
    /// R^2 mod q with R = 2^64.
    r_squared: u64,
    /// Forward twiddle factors (powers of ψ), Montgomery form.
    psi_powers: Vec<u64>,
    /// Inverse twiddle factors (powers of ψ^(-1)), Montgomery form.
    psi_inv_powers: Vec<u64>,
    /// N^(-1) mod q in Montgomery form.
    n_inv: u64,
}

impl NttContext {
    /// Creates an NTT context for the given dimension and modulus.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not a power of two or q ≢ 1 (mod 2n). Callers
    /// validate parameters before building a context.
    pub fn new(n: usize, q: u64) -> Self {
        assert!(n.is_power_of_two(), "n must be a power of two");
        assert!(q % (2 * n as u64) == 1, "q must be ≡ 1 (mod 2n)");

        let q_inv_neg = Self::compute_q_inv_neg(q);
        let r_squared = Self::compute_r_squared(q);

        let psi = Self::find_primitive_root(2 * n as u64, q);
        let psi_mont = Self::to_montgomery(psi, q, r_squared, q_inv_neg);
        let psi_powers = Self::compute_twiddle_factors(n, psi_mont, q, q_inv_neg, r_squared);

        let psi_inv = Self::mod_pow(psi, q - 2, q);
        let psi_inv_mont = Self::to_montgomery(psi_inv, q, r_squared, q_inv_neg);
        let psi_inv_powers =
            Self::compute_twiddle_factors(n, psi_inv_mont, q, q_inv_neg, r_squared);

        let n_inv_val = Self::mod_pow(n as u64, q - 2, q);
        let n_inv = Self::to_montgomery(n_inv_val, q, r_squared, q_inv_neg);

        Self {
            n,
            q,
            q_inv_neg,
            r_squared,
            psi_powers,
            psi_inv_powers,
            n_inv,
        }
    }

    /// Creates an NTT context with `DEFAULT_Q`.
    pub fn with_default_q(n: usize) -> Self {
        Self::new(n, DEFAULT_Q)
    }

    /// Returns the ring dimension.
    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Returns the modulus q.
    pub fn modulus(&self) -> u64 {
        self.q
    }

    /// Forward NTT in place (Cooley-Tukey, decimation in time).
    ///
    /// Input coefficients are converted to Montgomery form first.
    ///
    /// # Panics
    ///
    /// Panics if `coeffs.len() != n`.
    pub fn forward(&self, coeffs: &mut [u64]) {
        assert_eq!(coeffs.len(), self.n, "Input length must match dimension");

        for c in coeffs.iter_mut() {
            *c = Self::to_montgomery(*c, self.q, self.r_squared, self.q_inv_neg);
        }

        let n = self.n;
        let q = self.q;
        let mut t = n;
        let mut m = 1;

        while m < n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let j2 = j1 + t;
                let w = self.psi_powers[m + i];

                for j in j1..j2 {
                    let u = coeffs[j];
                    let v = self.montgomery_mul(coeffs[j + t], w);

                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    coeffs[j + t] = if u >= v { u - v } else { q - v + u };
                }
            }
            m <<= 1;
        }
    }

    /// Inverse NTT in place (Gentleman-Sande, decimation in frequency).
    ///
    /// Output is converted back out of Montgomery form.
    ///
    /// # Panics
    ///
    /// Panics if `coeffs.len() != n`.
    pub fn inverse(&self, coeffs: &mut [u64]) {
        assert_eq!(coeffs.len(), self.n, "Input length must match dimension");

        let q = self.q;
        let mut t = 1;
        let mut m = self.n;

        while m > 1 {
            m >>= 1;
            for i in 0..m {
                let j1 = i * 2 * t;
                let w = self.psi_inv_powers[m + i];

                for j in j1..(j1 + t) {
                    let u = coeffs[j];
                    let v = coeffs[j + t];

                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    let diff = if u >= v { u - v } else { q - v + u };
                    coeffs[j + t] = self.montgomery_mul(diff, w);
                }
            }
            t <<= 1;
        }

        // Scale by n^(-1), then leave Montgomery form
        for c in coeffs.iter_mut() {
            *c = self.montgomery_mul(*c, self.n_inv);
            *c = self.montgomery_mul(*c, 1);
        }
    }

    /// Pointwise multiplication in the NTT domain.
    ///
    /// # Panics
    ///
    /// Panics if any slice length differs from n.
    pub fn pointwise_mul(&self, a: &[u64], b: &[u64], result: &mut [u64]) {
        assert_eq!(a.len(), self.n, "Input length must match dimension");
        assert_eq!(b.len(), self.n, "Input length must match dimension");
        assert_eq!(result.len(), self.n, "Output length must match dimension");

        for ((r, &x), &y) in result.iter_mut().zip(a).zip(b) {
            *r = self.montgomery_mul(x, y);
        }
    }

    /// Fused pointwise multiply-accumulate: `acc += a ∘ b` in the NTT domain.
    pub fn pointwise_mul_acc(&self, acc: &mut [u64], a: &[u64], b: &[u64]) {
        assert_eq!(acc.len(), self.n, "Accumulator length must match dimension");
        let q = self.q;
        for ((r, &x), &y) in acc.iter_mut().zip(a).zip(b) {
            let sum = *r + self.montgomery_mul(x, y);
            *r = if sum >= q { sum - q } else { sum };
        }
    }

    #[inline]
    fn montgomery_mul(&self, a: u64, b: u64) -> u64 {
        let q = self.q;
        let ab = (a as u128) * (b as u128);
        let m = ((ab as u64).wrapping_mul(self.q_inv_neg)) as u128;
        let t = ((ab + m * (q as u128)) >> 64) as u64;
        if t >= q {
            t - q
        } else {
            t
        }
    }

    fn to_montgomery(a: u64, q: u64, r_squared: u64, q_inv_neg: u64) -> u64 {
        let ab = (a as u128) * (r_squared as u128);
        let m = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
        let t = ((ab + m * (q as u128)) >> 64) as u64;
        if t >= q {
            t - q
        } else {
            t
        }
    }

    fn compute_q_inv_neg(q: u64) -> u64 {
        let mut y: u64 = 1;
        for i in 1..64 {
            let yi = y.wrapping_mul(q) & (1u64 << i);
            y |= yi;
        }
        y.wrapping_neg()
    }

    fn compute_r_squared(q: u64) -> u64 {
        let r_mod_q = (1u128 << 64) % (q as u128);
        ((r_mod_q * r_mod_q) % (q as u128)) as u64
    }

    fn mod_pow(mut base: u64, mut exp: u64, m: u64) -> u64 {
        let mut result = 1u64;
        base %= m;
        while exp > 0 {
            if exp & 1 == 1 {
                result = ((result as u128 * base as u128) % m as u128) as u64;
            }
            exp >>= 1;
            base = ((base as u128 * base as u128) % m as u128) as u64;
        }
        result
    }

    /// Find a primitive n-th root of unity modulo q (n a power of two)
    fn find_primitive_root(n: u64, q: u64) -> u64 {
        let exp = (q - 1) / n;
        for g in 2..q {
            let candidate = Self::mod_pow(g, exp, q);
            // ψ^n = 1 and ψ^(n/2) ≠ 1
            if Self::mod_pow(candidate, n, q) == 1 && Self::mod_pow(candidate, n / 2, q) != 1 {
                return candidate;
            }
        }
        panic!("no primitive root of order {} modulo {}", n, q);
    }

    /// Twiddle factors in the bit-reversed order the butterflies consume them
    fn compute_twiddle_factors(
        n: usize,
        psi: u64,
        q: u64,
        q_inv_neg: u64,
        r_squared: u64,
    ) -> Vec<u64> {
        let mont_mul = |a: u64, b: u64| -> u64 {
            let ab = (a as u128) * (b as u128);
            let mm = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
            let t = ((ab + mm * (q as u128)) >> 64) as u64;
            if t >= q {
                t - q
            } else {
                t
            }
        };

        let one = Self::to_montgomery(1, q, r_squared, q_inv_neg);
        let mut factors = vec![0u64; n];
        factors[1] = one;

        for m in 1..n {
            if m.is_power_of_two() {
                // New level: ψ^(n/(2m))
                let exp = n / (2 * m);
                let mut pow = one;
                for _ in 0..exp {
                    pow = mont_mul(pow, psi);
                }
                factors[m] = pow;
            } else {
                let prev_idx = m & (m - 1);
                let step_idx = m & (!m + 1);
                factors[m] = mont_mul(factors[prev_idx], factors[step_idx]);
            }
        }

        factors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ntt_inverse_roundtrip() {
        for n in [16, 256, 2048, 4096] {
            let ctx = NttContext::with_default_q(n);
            let original: Vec<u64> = (0..n as u64).map(|i| (i * 12345) % DEFAULT_Q).collect();
            let mut coeffs = original.clone();

            ctx.forward(&mut coeffs);
            ctx.inverse(&mut coeffs);

            assert_eq!(coeffs, original, "roundtrip failed for n = {}", n);
        }
    }

    #[test]
    fn test_ntt_zero_polynomial() {
        let ctx = NttContext::with_default_q(256);
        let mut coeffs = vec![0u64; 256];
        ctx.forward(&mut coeffs);
        assert!(coeffs.iter().all(|&c| c == 0));
        ctx.inverse(&mut coeffs);
        assert!(coeffs.iter().all(|&c| c == 0));
    }

    #[test]
    fn test_negacyclic_convolution() {
        // x * x^(n-1) = x^n = -1 mod (X^n + 1)
        let n = 256;
        let ctx = NttContext::with_default_q(n);

        let mut a = vec![0u64; n];
        a[1] = 1;
        let mut b = vec![0u64; n];
        b[n - 1] = 1;

        ctx.forward(&mut a);
        ctx.forward(&mut b);
        let mut result = vec![0u64; n];
        ctx.pointwise_mul(&a, &b, &mut result);
        ctx.inverse(&mut result);

        assert_eq!(result[0], DEFAULT_Q - 1);
        assert!(result[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_pointwise_mul_acc_matches_sum_of_products() {
        let n = 256;
        let ctx = NttContext::with_default_q(n);

        let mut a: Vec<u64> = (0..n as u64).map(|i| i % 97).collect();
        let mut b: Vec<u64> = (0..n as u64).map(|i| (i * 5) % 89).collect();
        let mut c: Vec<u64> = (0..n as u64).map(|i| (i * 11) % 83).collect();
        ctx.forward(&mut a);
        ctx.forward(&mut b);
        ctx.forward(&mut c);

        // a*b + a*c
        let mut acc = vec![0u64; n];
        ctx.pointwise_mul_acc(&mut acc, &a, &b);
        ctx.pointwise_mul_acc(&mut acc, &a, &c);

        // a*(b+c)
        let b_plus_c: Vec<u64> = b.iter().zip(&c).map(|(&x, &y)| (x + y) % DEFAULT_Q).collect();
        let mut expected = vec![0u64; n];
        ctx.pointwise_mul(&a, &b_plus_c, &mut expected);

        assert_eq!(acc, expected);
    }
}
