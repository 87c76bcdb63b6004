//! Mathematical primitives for the encryption engine.
//!
//! - **Modular arithmetic** over Z_q and the plaintext modulus Z_t
//! - **Number-Theoretic Transform (NTT)** with Montgomery arithmetic
//! - **Polynomial operations** over R_q = Z_q[X]/(X^N + 1)
//! - **Sampling** of Gaussian errors and uniform masks
//!
//! # Example
//!
//! ```
//! use sealpir::math::{GaussianSampler, NttContext, Poly};
//!
//! let ctx = NttContext::with_default_q(256);
//! let mut sampler = GaussianSampler::with_seed(3.2, 1);
//! let mut poly = Poly::uniform(256, ctx.modulus(), &mut sampler);
//! poly.to_ntt(&ctx);
//! assert!(poly.is_ntt());
//! ```

pub mod modular;
pub mod ntt;
pub mod poly;
pub mod sampler;

pub use modular::ModQ;
pub use ntt::{NttContext, DEFAULT_Q};
pub use poly::Poly;
pub use sampler::{GaussianSampler, DEFAULT_SIGMA};
