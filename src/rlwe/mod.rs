//! RLWE (Ring Learning With Errors) encryption module
//!
//! This module implements RLWE encryption over the ring R_q = Z_q[X]/(X^N + 1)
//! with plaintexts in R_t.
//!
//! # Overview
//!
//! - Secret key s is a polynomial sampled from the error distribution
//! - Ciphertext (a, b) encrypts message m as b = -a·s + e + Δ·m
//! - Δ = ⌊q/t⌋ is the scaling factor
//!
//! # Galois Automorphisms
//!
//! Automorphisms τ_g: R → R defined by τ_g(X) = X^g drive query expansion:
//! combined with key switching they split one ciphertext into many.

mod enc;
mod galois;
mod types;

pub use galois::{
    apply_automorphism, automorphism_ciphertext, expansion_galois_element,
    expansion_galois_elements, is_valid_galois_element,
};
pub use types::{RlweCiphertext, RlweSecretKey};
