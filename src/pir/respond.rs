//! PIR Respond: Server reply computation
//!
//! Implements Respond(params, D', selections) → reply
//!
//! # Dimension Reduction
//!
//! Each round collapses one hypercube dimension with a homomorphic dot
//! product against that dimension's selection vector:
//!
//! ```text
//! product /= n_i
//! out[k] = Σ_j sel_i[j] · cur[k + j · product]      for k < product
//! ```
//!
//! Round 0 multiplies database plaintexts. Every later round first splits
//! each ciphertext of the previous round into F = 2·ceil(log2 q / logt)
//! plaintexts of logt-bit chunks, so the next round again multiplies
//! ciphertexts by plaintexts. Noise therefore does not compound across rounds;
//! the reply grows by a factor of F per extra dimension instead.

use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use crate::engine::RlweEngine;
use crate::math::Poly;
use crate::rlwe::RlweCiphertext;

use super::encode_db::PackedDatabase;
use super::plan::PirParams;

/// Respond(params, D', selections) → reply
///
/// Reduces every hypercube (all shards and columns) in parallel and
/// concatenates the results in hypercube order. `selections` are the
/// coefficient-domain outputs of query expansion.
pub fn respond(
    engine: &RlweEngine,
    selections: &[Vec<RlweCiphertext>],
    db: &PackedDatabase,
    params: &PirParams,
) -> Vec<RlweCiphertext> {
    let start = Instant::now();

    let prepared: Vec<Vec<RlweCiphertext>> = selections
        .par_iter()
        .map(|sel| {
            sel.iter()
                .map(|ct| {
                    let mut ct = ct.clone();
                    engine.to_ntt(&mut ct);
                    ct
                })
                .collect()
        })
        .collect();

    let reply: Vec<RlweCiphertext> = db
        .hypercubes()
        .par_iter()
        .flat_map_iter(|cube| generate_reply(engine, &prepared, cube, params))
        .collect();

    debug!(
        hypercubes = db.hypercube_count(),
        ciphertexts = reply.len(),
        elapsed = ?start.elapsed(),
        "generated reply"
    );
    reply
}

/// Reduce one hypercube to `F^(d-1)` coefficient-domain ciphertexts
///
/// `selections` must already be in the NTT domain, one vector per dimension.
pub fn generate_reply(
    engine: &RlweEngine,
    selections: &[Vec<RlweCiphertext>],
    cube: &[Poly],
    params: &PirParams,
) -> Vec<RlweCiphertext> {
    debug_assert_eq!(cube.len(), params.hypercube_capacity());
    debug_assert_eq!(selections.len(), params.dimension_count());

    let Some((first, rest)) = selections.split_first() else {
        return Vec::new();
    };

    let mut outputs = reduce_round(engine, first, cube);
    for sel in rest {
        let plaintexts = decompose_round(engine, &outputs);
        outputs = reduce_round(engine, sel, &plaintexts);
    }
    outputs
}

/// One dot-product round over the most significant remaining dimension
fn reduce_round(
    engine: &RlweEngine,
    selection: &[RlweCiphertext],
    plaintexts: &[Poly],
) -> Vec<RlweCiphertext> {
    let product = plaintexts.len() / selection.len();

    (0..product)
        .into_par_iter()
        .map(|k| {
            let mut acc = engine.zero_accumulator();
            for (j, sel) in selection.iter().enumerate() {
                engine.multiply_plain_acc(&mut acc, sel, &plaintexts[k + j * product]);
            }
            engine.from_ntt(&mut acc);
            acc
        })
        .collect()
}

/// Split every ciphertext into F NTT-form plaintexts; ciphertext k's chunks
/// land at `k·F .. (k+1)·F`
fn decompose_round(engine: &RlweEngine, ciphertexts: &[RlweCiphertext]) -> Vec<Poly> {
    ciphertexts
        .par_iter()
        .flat_map_iter(|ct| {
            engine
                .decompose_to_plaintexts(ct)
                .into_iter()
                .map(|pt| engine.prepare_plaintext(&pt))
        })
        .collect()
}
