//! Client and server sessions
//!
//! `ClientSession` owns the secret key and the randomness; `ServerSession`
//! owns the packed database and the per-client Galois key registry. Both
//! speak only in wire messages.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tracing::{debug, info};

use crate::engine::RlweEngine;
use crate::ks::GaloisKeys;
use crate::math::GaussianSampler;
use crate::rlwe::RlweSecretKey;

use super::coords::Coordinates;
use super::encode_db::{coeffs_to_bytes, pack, pack_items, PackedDatabase};
use super::error::{pir_err, PirError, Result};
use super::expand::expand_query;
use super::extract::{extract, extract_plaintext};
use super::plan::PirParams;
use super::query::{query, QueryState};
use super::respond::respond;
use super::wire::{CiphertextBundle, GaloisKeyMessage, QueryMessage, ReplyMessage};

/// The querying side of the protocol
#[derive(Debug)]
pub struct ClientSession {
    params: PirParams,
    engine: RlweEngine,
    client_id: u64,
    secret_key: RlweSecretKey,
    sampler: GaussianSampler,
}

impl ClientSession {
    /// Open a session with fresh keys drawn from OS entropy
    pub fn new(params: PirParams, client_id: u64) -> Result<Self> {
        let sampler = GaussianSampler::new(params.rlwe.sigma);
        Self::with_sampler(params, client_id, sampler)
    }

    /// Open a reproducible session from a 32-byte seed
    pub fn from_seed(params: PirParams, client_id: u64, seed: [u8; 32]) -> Result<Self> {
        let sampler = GaussianSampler::from_seed(params.rlwe.sigma, seed);
        Self::with_sampler(params, client_id, sampler)
    }

    fn with_sampler(params: PirParams, client_id: u64, mut sampler: GaussianSampler) -> Result<Self> {
        params.validate()?;
        let engine = RlweEngine::new(params.rlwe.clone());
        let secret_key = engine.generate_secret_key(&mut sampler);
        Ok(Self {
            params,
            engine,
            client_id,
            secret_key,
            sampler,
        })
    }

    pub fn params(&self) -> &PirParams {
        &self.params
    }

    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    /// Galois keys for exactly the elements expansion will use
    pub fn galois_keys(&mut self) -> Result<GaloisKeyMessage> {
        let keys = self.engine.generate_galois_keys(
            &self.secret_key,
            &self.params.galois_elements(),
            &mut self.sampler,
        );
        GaloisKeyMessage::new(self.client_id, &keys)
    }

    /// Plaintext row holding `index` inside its shard's hypercube
    pub fn plaintext_index(&self, index: u64) -> Result<usize> {
        Ok(Coordinates::for_index(index, &self.params)?.plaintext_index)
    }

    /// Item slot of `index` inside its plaintext
    pub fn offset(&self, index: u64) -> Result<usize> {
        Ok(Coordinates::for_index(index, &self.params)?.offset)
    }

    /// Build the query for `index`; keep the state for `recover`
    pub fn build_query(&mut self, index: u64) -> Result<(QueryState, QueryMessage)> {
        let (state, cts) = query(
            &self.engine,
            &self.secret_key,
            &mut self.sampler,
            &self.params,
            index,
        )?;
        let bundle = CiphertextBundle::from_ciphertexts(&self.engine, &cts)?;
        Ok((
            state,
            QueryMessage {
                client_id: self.client_id,
                bundle,
            },
        ))
    }

    /// Item bytes for the query `state` was produced with
    pub fn recover(&self, state: &QueryState, reply: &ReplyMessage) -> Result<Vec<u8>> {
        let cts = reply
            .bundle
            .ciphertexts(&self.engine, self.params.reply_ciphertexts())?;
        extract(&self.engine, &self.secret_key, state, &cts, &self.params)
    }

    /// Every byte of the queried plaintext row, all columns
    pub fn recover_plaintext(&self, state: &QueryState, reply: &ReplyMessage) -> Result<Vec<u8>> {
        let cts = reply
            .bundle
            .ciphertexts(&self.engine, self.params.reply_ciphertexts())?;
        let coeffs = extract_plaintext(&self.engine, &self.secret_key, state, &cts, &self.params)?;
        let bits = self.params.plaintext_bits();
        let len = coeffs.len() * bits as usize / 8;
        Ok(coeffs_to_bytes(&coeffs, bits, len))
    }
}

/// Per-client Galois keys, shared by concurrent `answer` calls
#[derive(Debug, Default)]
pub struct KeyRegistry {
    keys: RwLock<HashMap<u64, Arc<GaloisKeys>>>,
}

impl KeyRegistry {
    /// Insert or replace a client's keys
    pub fn insert(&self, client_id: u64, keys: GaloisKeys) {
        let mut map = self.keys.write().unwrap_or_else(|e| e.into_inner());
        map.insert(client_id, Arc::new(keys));
    }

    /// The client's keys; the lock is released before the caller uses them
    pub fn get(&self, client_id: u64) -> Option<Arc<GaloisKeys>> {
        let map = self.keys.read().unwrap_or_else(|e| e.into_inner());
        map.get(&client_id).cloned()
    }

    pub fn remove(&self, client_id: u64) -> bool {
        let mut map = self.keys.write().unwrap_or_else(|e| e.into_inner());
        map.remove(&client_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.keys.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The answering side of the protocol
#[derive(Debug)]
pub struct ServerSession {
    params: PirParams,
    engine: RlweEngine,
    registry: KeyRegistry,
    database: Option<Arc<PackedDatabase>>,
}

impl ServerSession {
    pub fn new(params: PirParams) -> Result<Self> {
        params.validate()?;
        let engine = RlweEngine::new(params.rlwe.clone());
        Ok(Self {
            params,
            engine,
            registry: KeyRegistry::default(),
            database: None,
        })
    }

    pub fn params(&self) -> &PirParams {
        &self.params
    }

    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    pub fn database(&self) -> Option<&Arc<PackedDatabase>> {
        self.database.as_ref()
    }

    /// Pack concatenated items; replaces any previous snapshot
    pub fn load_database(&mut self, raw: &[u8]) -> Result<()> {
        let db = pack(raw, &self.params)?;
        self.install(db);
        Ok(())
    }

    /// Pack items given one by one; replaces any previous snapshot
    pub fn load_items<T: AsRef<[u8]> + Sync>(&mut self, items: &[T]) -> Result<()> {
        let db = pack_items(items, &self.params)?;
        self.install(db);
        Ok(())
    }

    fn install(&mut self, db: PackedDatabase) {
        info!(
            items = db.num_items(),
            plaintexts = db.plaintext_count(),
            "database loaded"
        );
        self.database = Some(Arc::new(db));
    }

    /// Validate and cache a client's Galois keys
    pub fn register_keys(&self, message: &GaloisKeyMessage) -> Result<()> {
        let mut keys = message.keys()?;
        keys.validate(self.engine.ring_dim(), self.engine.gadget())
            .map_err(|e| pir_err!(DeserializationError, "client {}: {}", message.client_id, e))?;
        keys.prepare(self.engine.ctx());

        debug!(
            client_id = message.client_id,
            elements = ?keys.elements(),
            "registered Galois keys"
        );
        self.registry.insert(message.client_id, keys);
        Ok(())
    }

    /// Answer one query
    ///
    /// Fails with `MissingGaloisKey` for unregistered clients before the
    /// query is even decoded.
    pub fn answer(&self, message: &QueryMessage) -> Result<ReplyMessage> {
        let client_id = message.client_id;
        let keys = self
            .registry
            .get(client_id)
            .ok_or(PirError::MissingGaloisKey { client_id })?;
        let db = self.database.as_ref().ok_or(PirError::DatabaseNotLoaded)?;

        let start = Instant::now();
        let cts = message
            .bundle
            .ciphertexts(&self.engine, self.params.query_ciphertexts())?;
        let selections = expand_query(&self.engine, &cts, &keys, client_id, &self.params)?;
        let reply = respond(&self.engine, &selections, db, &self.params);
        let bundle = CiphertextBundle::from_ciphertexts(&self.engine, &reply)?;

        info!(
            client_id,
            reply_ciphertexts = reply.len(),
            elapsed = ?start.elapsed(),
            "answered query"
        );
        Ok(ReplyMessage { bundle })
    }
}
