//! SealPIR: private information retrieval with compressed queries
//!
//! A client fetches one item from a server-held database without the server
//! learning which one. The database is packed into plaintext polynomials on a
//! d-dimensional hypercube; the query is a single RLWE ciphertext that the
//! server expands into one selection ciphertext per hypercube coordinate.
//!
//! Key components:
//! - RLWE encryption over Z_q[X]/(X^N + 1) with plaintext modulus t = 2^logt + 1
//! - Key switching and Galois automorphisms driving query expansion
//! - Per-dimension plaintext dot products with ciphertext decomposition
//!   between rounds

pub mod params;
pub mod math;
pub mod rlwe;
pub mod ks;
pub mod engine;
pub mod pir;

pub use engine::RlweEngine;
pub use params::RlweParams;
pub use pir::{
    extract, pack, pack_items, plan, plan_with, query, respond, ClientSession, GaloisKeyMessage,
    PackedDatabase, PirError, PirParams, PlanConfig, QueryMessage, QueryState, ReplyMessage,
    ServerSession,
};
