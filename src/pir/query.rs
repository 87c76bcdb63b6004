//! PIR Query: Client query generation
//!
//! Implements Query(params, idx) → (state, query)
//!
//! # Query Compression
//!
//! A query selects one coordinate per hypercube dimension. Instead of one
//! ciphertext per candidate value, every dimension's one-hot vector is
//! written into the coefficients of the same plaintext polynomial:
//! dimension i owns coefficients `[base_i, base_i + n_i)` with
//! `base_i = n_0 + ... + n_{i-1}`, and a single 1 marks the selected value.
//! The server splits the polynomial back into per-slot ciphertexts with
//! Galois automorphisms (see `expand`).
//!
//! Expansion doubles every slot once per level, so the client writes
//! inv(2^L) mod t instead of 1.

use serde::{Deserialize, Serialize};

use crate::engine::RlweEngine;
use crate::math::GaussianSampler;
use crate::rlwe::{RlweCiphertext, RlweSecretKey};

use super::coords::Coordinates;
use super::error::Result;
use super::plan::PirParams;

/// What the client keeps to decode the reply
///
/// Holds no key material; the secret key stays in the client session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryState {
    /// Queried index (global)
    pub index: u64,
    /// Shard containing the queried item
    pub shard: usize,
    /// Plaintext row inside the shard's hypercube
    pub plaintext_index: usize,
    /// Item slot inside the plaintext, never sent to the server
    pub offset: usize,
}

/// One-hot slot positions for the given coordinates
///
/// Dimension i's slot is `Σ_{j<i} n_j + c_i`.
pub fn selection_slots(coords: &[usize], dimension_sizes: &[usize]) -> Vec<usize> {
    let mut base = 0;
    coords
        .iter()
        .zip(dimension_sizes)
        .map(|(&c, &size)| {
            let slot = base + c;
            base += size;
            slot
        })
        .collect()
}

/// Query(params, idx) → (state, query ciphertexts)
///
/// Fails with `IndexOutOfRange` iff `index ≥ num_items`.
pub fn query(
    engine: &RlweEngine,
    sk: &RlweSecretKey,
    sampler: &mut GaussianSampler,
    params: &PirParams,
    index: u64,
) -> Result<(QueryState, Vec<RlweCiphertext>)> {
    let coordinates = Coordinates::for_index(index, params)?;
    let n = params.plaintext_coeff_count();
    let slots = selection_slots(&coordinates.coords, &params.dimension_sizes);

    let mut plaintexts = vec![vec![0u64; n]; params.query_ciphertexts()];
    for slot in slots {
        let k = slot / n;
        plaintexts[k][slot % n] = engine.inverse_power_of_two(params.levels_for_ciphertext(k));
    }

    let ciphertexts = plaintexts
        .iter()
        .map(|pt| engine.encrypt(sk, pt, sampler))
        .collect();

    let state = QueryState {
        index,
        shard: coordinates.shard,
        plaintext_index: coordinates.plaintext_index,
        offset: coordinates.offset,
    };

    Ok((state, ciphertexts))
}
