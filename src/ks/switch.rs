//! Key-switching operation

use crate::math::{NttContext, Poly};
use crate::rlwe::{automorphism_ciphertext, RlweCiphertext};

use super::gadget::gadget_decompose;
use super::setup::KeySwitchingMatrix;

/// Apply key-switching to transform a ciphertext from key s to key s'
///
/// Given ciphertext (a, b) under key s and key-switching matrix K,
/// computes a new ciphertext (a', b') valid under key s'.
///
/// # Algorithm
///
/// 1. Decompose a using gadget: g⁻¹(a) = [a₀, a₁, ..., a_{ℓ-1}]
/// 2. Compute: (a', b') = (0, b) + Σᵢ aᵢ · K[i]
///
/// The products are accumulated in the NTT domain. Rows that were not
/// prepared ahead of time are transformed on the fly.
///
/// Input and output are in coefficient domain.
pub fn key_switch(
    ct: &RlweCiphertext,
    ks_matrix: &KeySwitchingMatrix,
    ctx: &NttContext,
) -> RlweCiphertext {
    let d = ct.ring_dim();
    let q = ct.modulus();

    let a_decomp = gadget_decompose(&ct.a, &ks_matrix.gadget);

    let mut acc_a = Poly::zero(d, q).to_ntt_new(ctx);
    let mut acc_b = acc_a.clone();

    for (mut digit, row) in a_decomp.into_iter().zip(&ks_matrix.rows) {
        digit.to_ntt(ctx);
        if row.is_ntt() {
            acc_a.mul_acc_ntt_domain(&digit, &row.a, ctx);
            acc_b.mul_acc_ntt_domain(&digit, &row.b, ctx);
        } else {
            acc_a.mul_acc_ntt_domain(&digit, &row.a.to_ntt_new(ctx), ctx);
            acc_b.mul_acc_ntt_domain(&digit, &row.b.to_ntt_new(ctx), ctx);
        }
    }

    acc_a.from_ntt(ctx);
    acc_b.from_ntt(ctx);
    acc_b += &ct.b;

    RlweCiphertext::from_parts(acc_a, acc_b)
}

/// Apply τ_g and switch the result back to the original key
///
/// `ks_matrix` must be the automorphism matrix for the same element g.
pub fn apply_galois(
    ct: &RlweCiphertext,
    g: usize,
    ks_matrix: &KeySwitchingMatrix,
    ctx: &NttContext,
) -> RlweCiphertext {
    key_switch(&automorphism_ciphertext(ct, g), ks_matrix, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ks::{generate_automorphism_ks_matrix, generate_ks_matrix, GadgetVector};
    use crate::math::GaussianSampler;
    use crate::params::RlweParams;
    use crate::rlwe::{apply_automorphism, RlweSecretKey};

    fn test_params() -> RlweParams {
        RlweParams::new(256, 12)
    }

    fn encrypt(
        sk: &RlweSecretKey,
        msg: &[u64],
        params: &RlweParams,
        sampler: &mut GaussianSampler,
        ctx: &NttContext,
    ) -> RlweCiphertext {
        let message = Poly::from_coeffs(msg.to_vec(), params.q);
        let a = Poly::uniform(params.ring_dim, params.q, sampler);
        let e = Poly::sample_gaussian(params.ring_dim, params.q, sampler);
        RlweCiphertext::encrypt(sk, &message, params.delta(), a, &e, ctx)
    }

    #[test]
    fn test_key_switch_correctness() {
        let params = test_params();
        let ctx = NttContext::new(params.ring_dim, params.q);
        let mut sampler = GaussianSampler::with_seed(params.sigma, 21);

        let sk1 = RlweSecretKey::generate(&params, &mut sampler);
        let sk2 = RlweSecretKey::generate(&params, &mut sampler);
        let gadget = GadgetVector::from_params(&params);
        let ks_matrix = generate_ks_matrix(&sk1, &sk2, &gadget, &mut sampler, &ctx);

        let msg: Vec<u64> = (0..params.ring_dim as u64).map(|i| (i * 17) % params.t).collect();
        let ct1 = encrypt(&sk1, &msg, &params, &mut sampler, &ctx);
        assert_eq!(ct1.decrypt(&sk1, params.t, &ctx), msg);

        let ct2 = key_switch(&ct1, &ks_matrix, &ctx);
        assert_eq!(ct2.decrypt(&sk2, params.t, &ctx), msg);
    }

    #[test]
    fn test_prepared_matrix_gives_same_result() {
        let params = test_params();
        let ctx = NttContext::new(params.ring_dim, params.q);
        let mut sampler = GaussianSampler::with_seed(params.sigma, 22);

        let sk1 = RlweSecretKey::generate(&params, &mut sampler);
        let sk2 = RlweSecretKey::generate(&params, &mut sampler);
        let gadget = GadgetVector::from_params(&params);
        let ks_matrix = generate_ks_matrix(&sk1, &sk2, &gadget, &mut sampler, &ctx);
        let mut prepared = ks_matrix.clone();
        prepared.prepare(&ctx);

        let msg: Vec<u64> = (0..params.ring_dim as u64).map(|i| i % 50).collect();
        let ct = encrypt(&sk1, &msg, &params, &mut sampler, &ctx);

        assert_eq!(key_switch(&ct, &ks_matrix, &ctx), key_switch(&ct, &prepared, &ctx));
    }

    #[test]
    fn test_key_switch_after_homomorphic_add() {
        let params = test_params();
        let ctx = NttContext::new(params.ring_dim, params.q);
        let mut sampler = GaussianSampler::with_seed(params.sigma, 23);

        let sk1 = RlweSecretKey::generate(&params, &mut sampler);
        let sk2 = RlweSecretKey::generate(&params, &mut sampler);
        let gadget = GadgetVector::from_params(&params);
        let ks_matrix = generate_ks_matrix(&sk1, &sk2, &gadget, &mut sampler, &ctx);

        let m1: Vec<u64> = (0..params.ring_dim as u64).map(|i| i % 30).collect();
        let m2: Vec<u64> = (0..params.ring_dim as u64).map(|i| (i + 10) % 30).collect();
        let ct1 = encrypt(&sk1, &m1, &params, &mut sampler, &ctx);
        let ct2 = encrypt(&sk1, &m2, &params, &mut sampler, &ctx);

        let switched = key_switch(&ct1.add(&ct2), &ks_matrix, &ctx);
        let expected: Vec<u64> = m1.iter().zip(&m2).map(|(a, b)| a + b).collect();
        assert_eq!(switched.decrypt(&sk2, params.t, &ctx), expected);
    }

    #[test]
    fn test_apply_galois_permutes_message() {
        let params = test_params();
        let ctx = NttContext::new(params.ring_dim, params.q);
        let mut sampler = GaussianSampler::with_seed(params.sigma, 24);

        let sk = RlweSecretKey::generate(&params, &mut sampler);
        let gadget = GadgetVector::from_params(&params);
        let g = params.ring_dim + 1;
        let mut ks_matrix = generate_automorphism_ks_matrix(&sk, g, &gadget, &mut sampler, &ctx);
        ks_matrix.prepare(&ctx);

        let msg: Vec<u64> = (0..params.ring_dim as u64).map(|i| (i * 3 + 1) % params.t).collect();
        let ct = encrypt(&sk, &msg, &params, &mut sampler, &ctx);

        let expected = apply_automorphism(&Poly::from_coeffs(msg, params.t), g);
        let decrypted = apply_galois(&ct, g, &ks_matrix, &ctx).decrypt(&sk, params.t, &ctx);
        assert_eq!(decrypted, expected.coeffs());
    }
}
