//! SealPIR protocol layer
//!
//! # Protocol Overview
//!
//! 1. **Plan**: pick ring dimension, plaintext width and hypercube shape for
//!    the database (`plan`)
//! 2. **Pack**: items become plaintext polynomials laid out on a
//!    d-dimensional hypercube (`pack`)
//! 3. **Query**: the client encrypts one selection slot per dimension into a
//!    single ciphertext (`query`)
//! 4. **Expand**: the server splits that ciphertext into per-slot selection
//!    ciphertexts with Galois automorphisms (`expand_query`)
//! 5. **Respond**: one dot product per dimension, with ciphertexts
//!    decomposed into plaintexts between rounds (`respond`)
//! 6. **Extract**: the client peels the layers off in reverse (`extract`)
//!
//! `ClientSession` and `ServerSession` wrap these steps behind wire messages.
//!
//! # Example
//!
//! ```no_run
//! use sealpir::pir::{plan, ClientSession, ServerSession};
//!
//! # fn main() -> sealpir::pir::Result<()> {
//! let params = plan(4096, 288)?;
//! let database = vec![0u8; 4096 * 288];
//!
//! let mut server = ServerSession::new(params.clone())?;
//! server.load_database(&database)?;
//!
//! let mut client = ClientSession::new(params, 1)?;
//! server.register_keys(&client.galois_keys()?)?;
//!
//! let (state, query) = client.build_query(42)?;
//! let reply = server.answer(&query)?;
//! let item = client.recover(&state, &reply)?;
//! assert_eq!(item.len(), 288);
//! # Ok(())
//! # }
//! ```

mod coords;
mod encode_db;
pub mod error;
mod expand;
mod extract;
mod plan;
mod query;
mod respond;
mod session;
mod wire;

pub use coords::{flat_index, mixed_radix, Coordinates};
pub use encode_db::{bytes_to_coeffs, coeffs_to_bytes, pack, pack_items, PackedDatabase};
pub use error::{PirError, Result};
pub use expand::{expand_ciphertext, expand_query};
pub use extract::{decode_reply, extract, extract_plaintext};
pub use plan::{
    plan, plan_with, PirParams, PlanConfig, DEFAULT_PLAINTEXT_BITS, DEFAULT_POLY_DEGREES,
    MAX_DIMENSION_COUNT, MAX_QUERY_CIPHERTEXTS,
};
pub use query::{query, selection_slots, QueryState};
pub use respond::{generate_reply, respond};
pub use session::{ClientSession, KeyRegistry, ServerSession};
pub use wire::{CiphertextBundle, GaloisKeyMessage, QueryMessage, ReplyMessage};
