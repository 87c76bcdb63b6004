//! Server-side query expansion
//!
//! Turns the compressed query back into one encrypted selection bit per
//! hypercube slot.
//!
//! # Algorithm
//!
//! A ciphertext holding `c` slots is expanded over `L = ceil(log2 c)` levels.
//! At level j, with g_j = N/2^j + 1, every ciphertext c0 splits in two:
//!
//! ```text
//! c1 = c0 · X^(-2^j)
//! even = c0 + Sub(c0, g_j)
//! odd  = c1 + Sub(c1, g_j)
//! ```
//!
//! where `Sub` is the automorphism followed by a key switch. τ_{g_j} fixes
//! the exponents that are even multiples of 2^j and negates the odd
//! multiples, so `even` keeps half the slots (doubled) and `odd` the other
//! half, shifted down. After L levels output k encrypts 2^L · m_k as its
//! constant term, which is 1 or 0 because the client scaled by inv(2^L).

use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use crate::engine::RlweEngine;
use crate::ks::GaloisKeys;
use crate::rlwe::{expansion_galois_element, RlweCiphertext};

use super::error::{pir_err, PirError, Result};
use super::plan::PirParams;

/// Expand query ciphertexts into one selection vector per dimension
///
/// Fails with `MissingGaloisKey` if `keys` lacks an element the expansion
/// needs, and with `DeserializationError` if the ciphertext count does not
/// match the parameters.
pub fn expand_query(
    engine: &RlweEngine,
    query: &[RlweCiphertext],
    keys: &GaloisKeys,
    client_id: u64,
    params: &PirParams,
) -> Result<Vec<Vec<RlweCiphertext>>> {
    if query.len() != params.query_ciphertexts() {
        return Err(pir_err!(
            DeserializationError,
            "query has {} ciphertexts, parameters expect {}",
            query.len(),
            params.query_ciphertexts()
        ));
    }
    let missing = params
        .galois_elements()
        .into_iter()
        .any(|g| keys.get(g).is_none());
    if missing {
        return Err(PirError::MissingGaloisKey { client_id });
    }

    let start = Instant::now();
    let mut slots = Vec::with_capacity(params.query_slots());
    for (k, ct) in query.iter().enumerate() {
        let expanded = expand_ciphertext(engine, ct, params.slots_in_ciphertext(k), keys)
            .ok_or(PirError::MissingGaloisKey { client_id })?;
        slots.extend(expanded);
    }

    let mut selections = Vec::with_capacity(params.dimension_count());
    let mut rest = slots.into_iter();
    for &size in &params.dimension_sizes {
        selections.push(rest.by_ref().take(size).collect::<Vec<_>>());
    }

    debug!(
        client_id,
        slots = params.query_slots(),
        levels = params.expansion_levels(),
        elapsed = ?start.elapsed(),
        "expanded query"
    );
    Ok(selections)
}

/// Expand one ciphertext into its first `count` slots
///
/// `None` if a needed Galois key is missing.
pub fn expand_ciphertext(
    engine: &RlweEngine,
    ct: &RlweCiphertext,
    count: usize,
    keys: &GaloisKeys,
) -> Option<Vec<RlweCiphertext>> {
    let n = engine.ring_dim();
    let mut cts = vec![ct.clone()];

    let mut level = 0u32;
    while cts.len() < count {
        let g = expansion_galois_element(n, level);
        let step = 1usize << level;

        // Outputs at k + step ≥ count would only feed discarded slots
        let halves: Vec<(RlweCiphertext, Option<RlweCiphertext>)> = cts
            .par_iter()
            .enumerate()
            .map(|(k, c0)| {
                let even = engine.add(c0, &engine.apply_galois(c0, g, keys)?);
                let odd = if k + step < count {
                    let c1 = engine.multiply_power_of_x(c0, 2 * n - step);
                    Some(engine.add(&c1, &engine.apply_galois(&c1, g, keys)?))
                } else {
                    None
                };
                Some((even, odd))
            })
            .collect::<Option<_>>()?;

        let (evens, odds): (Vec<_>, Vec<_>) = halves.into_iter().unzip();
        cts = evens;
        cts.extend(odds.into_iter().flatten());
        level += 1;
    }

    Some(cts)
}
