//! PIR Extract: Client reply decoding
//!
//! Implements Extract(params, state, reply) → item
//!
//! # Algorithm
//! 1. Decrypt every reply ciphertext of a hypercube
//! 2. Regroup each F consecutive plaintexts into the ciphertext they were
//!    split from, and repeat until one ciphertext is left (d-1 times)
//! 3. Decrypt it to the selected database plaintext
//! 4. Concatenate the item's columns and cut out its bytes

use crate::engine::RlweEngine;
use crate::rlwe::{RlweCiphertext, RlweSecretKey};

use super::encode_db::coeffs_to_bytes;
use super::error::{pir_err, Result};
use super::plan::PirParams;
use super::query::QueryState;

/// Decode the `F^(d-1)` ciphertexts of one hypercube to plaintext coefficients
pub fn decode_reply(
    engine: &RlweEngine,
    sk: &RlweSecretKey,
    ciphertexts: &[RlweCiphertext],
    params: &PirParams,
) -> Result<Vec<u64>> {
    let expected = params.reply_ciphertexts_per_hypercube();
    if ciphertexts.len() != expected {
        return Err(pir_err!(
            DeserializationError,
            "hypercube reply has {} ciphertexts, expected {}",
            ciphertexts.len(),
            expected
        ));
    }

    let ratio = params.expansion_ratio();
    let mut layer: Vec<RlweCiphertext> = ciphertexts.to_vec();
    for _ in 1..params.dimension_count() {
        let plaintexts: Vec<Vec<u64>> = layer.iter().map(|ct| engine.decrypt(sk, ct)).collect();
        layer = plaintexts
            .chunks(ratio)
            .map(|group| engine.compose_from_plaintexts(group))
            .collect();
    }

    match layer.as_slice() {
        [ct] => Ok(engine.decrypt(sk, ct)),
        _ => Err(pir_err!(
            DeserializationError,
            "reply did not reduce to a single ciphertext"
        )),
    }
}

/// Plaintext coefficients of the queried row, all columns concatenated
pub fn extract_plaintext(
    engine: &RlweEngine,
    sk: &RlweSecretKey,
    state: &QueryState,
    reply: &[RlweCiphertext],
    params: &PirParams,
) -> Result<Vec<u64>> {
    if reply.len() != params.reply_ciphertexts() {
        return Err(pir_err!(
            DeserializationError,
            "reply has {} ciphertexts, parameters imply {}",
            reply.len(),
            params.reply_ciphertexts()
        ));
    }
    if state.shard >= params.shards {
        return Err(pir_err!(
            DeserializationError,
            "query state names shard {} of {}",
            state.shard,
            params.shards
        ));
    }

    let per_cube = params.reply_ciphertexts_per_hypercube();
    let columns = params.plaintexts_per_item();
    let first_cube = state.shard * columns;

    let mut coeffs = Vec::with_capacity(columns * params.plaintext_coeff_count());
    for cube in first_cube..first_cube + columns {
        let cts = &reply[cube * per_cube..(cube + 1) * per_cube];
        coeffs.extend(decode_reply(engine, sk, cts, params)?);
    }
    Ok(coeffs)
}

/// Extract(params, state, reply) → item bytes
pub fn extract(
    engine: &RlweEngine,
    sk: &RlweSecretKey,
    state: &QueryState,
    reply: &[RlweCiphertext],
    params: &PirParams,
) -> Result<Vec<u8>> {
    let coeffs = extract_plaintext(engine, sk, state, reply, params)?;
    let start = state.offset * params.coeffs_per_item();
    let end = start + params.coeffs_per_item();
    let item = coeffs.get(start..end).ok_or_else(|| {
        pir_err!(
            DeserializationError,
            "item offset {} past decoded plaintext",
            state.offset
        )
    })?;
    Ok(coeffs_to_bytes(item, params.plaintext_bits(), params.item_bytes))
}
