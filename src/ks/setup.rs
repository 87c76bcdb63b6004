//! Key-switching matrix and Galois key generation

use std::collections::BTreeMap;

use crate::math::{GaussianSampler, NttContext, Poly};
use crate::rlwe::{apply_automorphism, is_valid_galois_element, RlweCiphertext, RlweSecretKey};
use serde::{Deserialize, Serialize};

use super::gadget::GadgetVector;

/// Key-switching matrix from secret key s to secret key s'
///
/// The matrix consists of ℓ RLWE ciphertexts encrypting s·z^i under s':
/// ```text
/// K[i] = RLWE_{s'}(s·z^i) = (a_i, -a_i·s' + e_i + s·z^i)
/// ```
///
/// Rows travel in coefficient domain. The server moves them to the NTT
/// domain once with [`KeySwitchingMatrix::prepare`] before switching.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySwitchingMatrix {
    /// ℓ RLWE ciphertexts
    pub rows: Vec<RlweCiphertext>,
    /// Gadget parameters
    pub gadget: GadgetVector,
}

impl KeySwitchingMatrix {
    /// Get the ring dimension
    pub fn ring_dim(&self) -> usize {
        self.rows.first().map_or(0, |row| row.ring_dim())
    }

    /// Get the number of rows (same as gadget length)
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the matrix is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether every row is already in the NTT domain
    pub fn is_prepared(&self) -> bool {
        self.rows.iter().all(|row| row.is_ntt())
    }

    /// Move every row to the NTT domain (idempotent)
    pub fn prepare(&mut self, ctx: &NttContext) {
        for row in &mut self.rows {
            row.to_ntt(ctx);
        }
    }
}

/// Generate a key-switching matrix from secret key s to secret key s'
///
/// This creates ℓ RLWE encryptions of s·z^i under s':
/// ```text
/// K[i] = (a_i, -a_i·s' + e_i + s·z^i)
/// ```
pub fn generate_ks_matrix(
    from_key: &RlweSecretKey,
    to_key: &RlweSecretKey,
    gadget: &GadgetVector,
    sampler: &mut GaussianSampler,
    ctx: &NttContext,
) -> KeySwitchingMatrix {
    let d = from_key.ring_dim();
    let q = from_key.modulus();

    debug_assert_eq!(d, to_key.ring_dim(), "Keys must have same ring dimension");
    debug_assert_eq!(q, to_key.modulus(), "Keys must have same modulus");

    let rows = gadget
        .powers()
        .into_iter()
        .map(|power| {
            let a = Poly::uniform(d, q, sampler);
            let error = Poly::sample_gaussian(d, q, sampler);

            // b = -a·s' + e + s·z^i
            let neg_a_s_prime = -a.mul_ntt(&to_key.poly, ctx);
            let s_scaled = from_key.poly.scalar_mul(power);
            let b = &(&neg_a_s_prime + &error) + &s_scaled;

            RlweCiphertext::from_parts(a, b)
        })
        .collect();

    KeySwitchingMatrix {
        rows,
        gadget: gadget.clone(),
    }
}

/// Generate a key-switching matrix for automorphism
///
/// For Galois automorphism τ_g, creates a matrix from τ_g(s) to s.
/// This is used to switch back after applying an automorphism to a ciphertext.
pub fn generate_automorphism_ks_matrix(
    sk: &RlweSecretKey,
    galois_element: usize,
    gadget: &GadgetVector,
    sampler: &mut GaussianSampler,
    ctx: &NttContext,
) -> KeySwitchingMatrix {
    let auto_s = RlweSecretKey::from_poly(apply_automorphism(&sk.poly, galois_element));
    generate_ks_matrix(&auto_s, sk, gadget, sampler, ctx)
}

/// Galois keys: one automorphism key-switching matrix per Galois element
///
/// Generated by the client for exactly the elements query expansion needs,
/// then handed to the server, which keeps them per client.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaloisKeys {
    keys: BTreeMap<usize, KeySwitchingMatrix>,
}

impl GaloisKeys {
    /// Generate keys for every element in `elements`
    pub fn generate(
        sk: &RlweSecretKey,
        elements: &[usize],
        gadget: &GadgetVector,
        sampler: &mut GaussianSampler,
        ctx: &NttContext,
    ) -> Self {
        let keys = elements
            .iter()
            .map(|&g| {
                (
                    g,
                    generate_automorphism_ks_matrix(sk, g, gadget, sampler, ctx),
                )
            })
            .collect();
        Self { keys }
    }

    /// Key-switching matrix for Galois element `g`, if present
    pub fn get(&self, g: usize) -> Option<&KeySwitchingMatrix> {
        self.keys.get(&g)
    }

    /// Galois elements covered, ascending
    pub fn elements(&self) -> Vec<usize> {
        self.keys.keys().copied().collect()
    }

    /// Number of keys held
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no keys are held
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Move every matrix to the NTT domain
    pub fn prepare(&mut self, ctx: &NttContext) {
        for matrix in self.keys.values_mut() {
            matrix.prepare(ctx);
        }
    }

    /// Structural check of keys received from an untrusted peer
    ///
    /// Every matrix must match `gadget`, have ring dimension `ring_dim`, sit in
    /// coefficient domain and hold only coefficients below q.
    pub fn validate(&self, ring_dim: usize, gadget: &GadgetVector) -> Result<(), &'static str> {
        for (&g, matrix) in &self.keys {
            if !is_valid_galois_element(g, ring_dim) {
                return Err("invalid Galois element");
            }
            if matrix.gadget != *gadget || matrix.len() != gadget.len {
                return Err("key-switching matrix does not match gadget");
            }
            for row in &matrix.rows {
                for poly in [&row.a, &row.b] {
                    if poly.dimension() != ring_dim || poly.modulus() != gadget.q {
                        return Err("key-switching row has wrong shape");
                    }
                    if poly.is_ntt() {
                        return Err("key-switching row must be in coefficient domain");
                    }
                    if poly.coeffs().iter().any(|&c| c >= gadget.q) {
                        return Err("key-switching coefficient out of range");
                    }
                }
            }
        }
        Ok(())
    }
}
