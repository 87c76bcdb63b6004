//! Encryption engine facade
//!
//! `RlweEngine` bundles the scheme parameters with their NTT tables and exposes
//! the handful of operations the PIR protocol needs. Protocol code goes
//! through this type and never touches polynomial arithmetic directly.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::ks::{apply_galois, GadgetVector, GaloisKeys};
use crate::math::{GaussianSampler, ModQ, NttContext, Poly};
use crate::params::RlweParams;
use crate::rlwe::{RlweCiphertext, RlweSecretKey};

/// RLWE engine: parameters plus precomputed NTT context
#[derive(Debug, Clone)]
pub struct RlweEngine {
    params: RlweParams,
    ctx: NttContext,
    gadget: GadgetVector,
}

impl RlweEngine {
    /// Build an engine for validated parameters
    ///
    /// # Panics
    ///
    /// Panics if q admits no negacyclic NTT of size `ring_dim`.
    pub fn new(params: RlweParams) -> Self {
        let ctx = NttContext::new(params.ring_dim, params.q);
        let gadget = GadgetVector::from_params(&params);
        Self {
            params,
            ctx,
            gadget,
        }
    }

    pub fn params(&self) -> &RlweParams {
        &self.params
    }

    pub fn ctx(&self) -> &NttContext {
        &self.ctx
    }

    pub fn gadget(&self) -> &GadgetVector {
        &self.gadget
    }

    /// Ring dimension N, also the plaintext coefficient count
    pub fn ring_dim(&self) -> usize {
        self.params.ring_dim
    }

    /// Plaintext modulus t
    pub fn plaintext_modulus(&self) -> u64 {
        self.params.t
    }

    /// Decryption ceiling in bits, log2(q / 2t)
    pub fn noise_ceiling_bits(&self) -> f64 {
        self.params.noise_ceiling_bits()
    }

    /// inv(2^levels) mod t, the value a query slot carries so that
    /// `levels` doubling steps of expansion leave exactly 1 behind
    pub fn inverse_power_of_two(&self, levels: u32) -> u64 {
        let t = self.params.t;
        // t is odd, so 2 is invertible with inverse (t + 1) / 2
        ModQ::pow((t + 1) / 2, levels as u64, t)
    }

    pub fn generate_secret_key(&self, sampler: &mut GaussianSampler) -> RlweSecretKey {
        RlweSecretKey::generate(&self.params, sampler)
    }

    /// Automorphism keys for each Galois element in `elements`
    pub fn generate_galois_keys(
        &self,
        sk: &RlweSecretKey,
        elements: &[usize],
        sampler: &mut GaussianSampler,
    ) -> GaloisKeys {
        GaloisKeys::generate(sk, elements, &self.gadget, sampler, &self.ctx)
    }

    /// Encrypt plaintext coefficients (each below t, at most N of them;
    /// missing trailing coefficients are zero)
    pub fn encrypt(
        &self,
        sk: &RlweSecretKey,
        plaintext: &[u64],
        sampler: &mut GaussianSampler,
    ) -> RlweCiphertext {
        let n = self.params.ring_dim;
        let q = self.params.q;
        debug_assert!(plaintext.len() <= n);
        debug_assert!(plaintext.iter().all(|&c| c < self.params.t));

        let mut coeffs = plaintext.to_vec();
        coeffs.resize(n, 0);
        let message = Poly::from_coeffs(coeffs, q);
        let a = Poly::uniform(n, q, sampler);
        let error = Poly::sample_gaussian(n, q, sampler);

        RlweCiphertext::encrypt(sk, &message, self.params.delta(), a, &error, &self.ctx)
    }

    /// Decrypt to N plaintext coefficients in [0, t)
    pub fn decrypt(&self, sk: &RlweSecretKey, ct: &RlweCiphertext) -> Vec<u64> {
        if ct.is_ntt() {
            let mut ct = ct.clone();
            ct.from_ntt(&self.ctx);
            ct.decrypt(sk, self.params.t, &self.ctx)
        } else {
            ct.decrypt(sk, self.params.t, &self.ctx)
        }
    }

    pub fn add(&self, lhs: &RlweCiphertext, rhs: &RlweCiphertext) -> RlweCiphertext {
        lhs.add(rhs)
    }

    /// Lift plaintext coefficients into R_q and move them to the NTT domain
    pub fn prepare_plaintext(&self, plaintext: &[u64]) -> Poly {
        let mut coeffs = plaintext.to_vec();
        coeffs.resize(self.params.ring_dim, 0);
        let mut poly = Poly::from_coeffs(coeffs, self.params.q);
        poly.to_ntt(&self.ctx);
        poly
    }

    /// NTT-domain zero ciphertext, the seed for `multiply_plain_acc`
    pub fn zero_accumulator(&self) -> RlweCiphertext {
        RlweCiphertext::zero_ntt(self.params.ring_dim, self.params.q, &self.ctx)
    }

    /// Move a ciphertext into the NTT domain
    pub fn to_ntt(&self, ct: &mut RlweCiphertext) {
        ct.to_ntt(&self.ctx);
    }

    /// Move a ciphertext back to coefficient domain
    pub fn from_ntt(&self, ct: &mut RlweCiphertext) {
        ct.from_ntt(&self.ctx);
    }

    /// acc += ct · plaintext, all operands in the NTT domain
    pub fn multiply_plain_acc(&self, acc: &mut RlweCiphertext, ct: &RlweCiphertext, plaintext: &Poly) {
        acc.mul_plain_acc(ct, plaintext, &self.ctx);
    }

    /// τ_g followed by a key switch back to the client key.
    /// `None` if `keys` holds no matrix for `g`.
    pub fn apply_galois(
        &self,
        ct: &RlweCiphertext,
        g: usize,
        keys: &GaloisKeys,
    ) -> Option<RlweCiphertext> {
        let matrix = keys.get(g)?;
        Some(apply_galois(ct, g, matrix, &self.ctx))
    }

    /// Multiply by X^k, k in [0, 2N). X^(2N - k) is X^(-k).
    pub fn multiply_power_of_x(&self, ct: &RlweCiphertext, k: usize) -> RlweCiphertext {
        ct.mul_monomial(k)
    }

    /// Split a coefficient-domain ciphertext into plaintexts of logt-bit chunks.
    ///
    /// Yields `expansion_ratio()` plaintexts: the chunks of `a`, then those
    /// of `b`, least significant chunk first.
    pub fn decompose_to_plaintexts(&self, ct: &RlweCiphertext) -> Vec<Vec<u64>> {
        let bits = self.params.plaintext_bits;
        let chunks = self.params.chunks_per_coeff();
        let mask = (1u64 << bits) - 1;

        let mut out = Vec::with_capacity(2 * chunks);
        for poly in [&ct.a, &ct.b] {
            for c in 0..chunks {
                let shift = c as u32 * bits;
                out.push(poly.coeffs().iter().map(|&v| (v >> shift) & mask).collect());
            }
        }
        out
    }

    /// Inverse of `decompose_to_plaintexts`
    ///
    /// Chunks beyond the plaintext width are masked off, and the
    /// recomposed value is reduced mod q.
    pub fn compose_from_plaintexts(&self, plaintexts: &[Vec<u64>]) -> RlweCiphertext {
        let n = self.params.ring_dim;
        let q = self.params.q;
        let bits = self.params.plaintext_bits;
        let chunks = self.params.chunks_per_coeff();
        let mask = (1u64 << bits) - 1;
        debug_assert_eq!(plaintexts.len(), 2 * chunks);

        let compose = |parts: &[Vec<u64>]| {
            let coeffs = (0..n)
                .map(|i| {
                    let value = parts.iter().enumerate().fold(0u128, |acc, (c, pt)| {
                        acc | (((pt[i] & mask) as u128) << (c as u32 * bits))
                    });
                    (value % q as u128) as u64
                })
                .collect();
            Poly::from_coeffs(coeffs, q)
        };

        let (a_parts, b_parts) = plaintexts.split_at(chunks);
        RlweCiphertext::from_parts(compose(a_parts), compose(b_parts))
    }

    /// Serialized size of one ciphertext: 2·N little-endian u64 coefficients
    pub fn ciphertext_byte_size(&self) -> usize {
        2 * self.params.ring_dim * 8
    }

    /// Write a coefficient-domain ciphertext as `a` then `b` coefficients
    pub fn write_ciphertext<W: Write>(&self, ct: &RlweCiphertext, writer: &mut W) -> io::Result<()> {
        debug_assert!(!ct.is_ntt());
        for poly in [&ct.a, &ct.b] {
            for &c in poly.coeffs() {
                writer.write_u64::<LittleEndian>(c)?;
            }
        }
        Ok(())
    }

    /// Read one ciphertext, rejecting coefficients outside [0, q)
    pub fn read_ciphertext<R: Read>(&self, reader: &mut R) -> io::Result<RlweCiphertext> {
        let n = self.params.ring_dim;
        let q = self.params.q;

        let mut read_poly = || -> io::Result<Poly> {
            let mut coeffs = vec![0u64; n];
            reader.read_u64_into::<LittleEndian>(&mut coeffs)?;
            if coeffs.iter().any(|&c| c >= q) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "ciphertext coefficient not reduced mod q",
                ));
            }
            Ok(Poly::from_coeffs(coeffs, q))
        };

        let a = read_poly()?;
        let b = read_poly()?;
        Ok(RlweCiphertext::from_parts(a, b))
    }
}
