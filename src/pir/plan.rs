//! Parameter planning
//!
//! `plan(num_items, item_bytes)` picks the ring dimension, plaintext width and
//! hypercube shape for a database. Both parties derive (or exchange) the same
//! `PirParams`; everything else in the protocol is a function of it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::params::{
    RlweParams, MAX_PLAINTEXT_BITS, MAX_RING_DIM, MIN_PLAINTEXT_BITS, MIN_RING_DIM,
    NOISE_MARGIN_BITS,
};
use crate::rlwe::expansion_galois_elements;

use super::error::{pir_err, PirError, Result};

/// Largest hypercube dimension count the planner considers
pub const MAX_DIMENSION_COUNT: usize = 4;
/// Upper bound on `PlanConfig::max_query_ciphertexts`
pub const MAX_QUERY_CIPHERTEXTS: usize = 16;
/// Ring dimensions searched when none is forced, ascending
pub const DEFAULT_POLY_DEGREES: [usize; 2] = [2048, 4096];
/// Plaintext widths searched when none is forced, widest first
pub const DEFAULT_PLAINTEXT_BITS: [u32; 4] = [16, 12, 10, 8];

/// Planner overrides
///
/// Every field is optional in JSON; missing fields take the defaults.
///
/// ```
/// use sealpir::pir::PlanConfig;
///
/// let config: PlanConfig = serde_json::from_str(r#"{ "plaintext_bits": 12 }"#).unwrap();
/// assert_eq!(config.plaintext_bits, Some(12));
/// assert_eq!(config.shards, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Force the ring dimension N
    pub poly_degree: Option<usize>,
    /// Force logt
    pub plaintext_bits: Option<u32>,
    /// Force the hypercube dimension count d
    pub dimension_count: Option<usize>,
    /// Cap on items packed into one plaintext
    pub max_items_per_plaintext: Option<usize>,
    /// Query ciphertexts allowed; Σ dimension_sizes ≤ N · this
    pub max_query_ciphertexts: usize,
    /// Independent sub-databases answered with the same query
    pub shards: usize,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            poly_degree: None,
            plaintext_bits: None,
            dimension_count: None,
            max_items_per_plaintext: None,
            max_query_ciphertexts: 1,
            shards: 1,
        }
    }
}

impl PlanConfig {
    /// Load overrides from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&text).map_err(|e| {
            pir_err!(
                DeserializationError,
                "{}: {}",
                path.as_ref().display(),
                e
            )
        })
    }

    fn check(&self) -> Result<()> {
        if let Some(n) = self.poly_degree {
            if !n.is_power_of_two() || !(MIN_RING_DIM..=MAX_RING_DIM).contains(&n) {
                return Err(pir_err!(InvalidParameters, "unsupported poly_degree {}", n));
            }
        }
        if let Some(bits) = self.plaintext_bits {
            if !(MIN_PLAINTEXT_BITS..=MAX_PLAINTEXT_BITS).contains(&bits) {
                return Err(pir_err!(InvalidParameters, "unsupported plaintext_bits {}", bits));
            }
        }
        if let Some(d) = self.dimension_count {
            if !(1..=MAX_DIMENSION_COUNT).contains(&d) {
                return Err(pir_err!(
                    InvalidParameters,
                    "dimension_count must be in 1..={}, got {}",
                    MAX_DIMENSION_COUNT,
                    d
                ));
            }
        }
        if self.max_items_per_plaintext == Some(0) {
            return Err(pir_err!(InvalidParameters, "max_items_per_plaintext must be positive"));
        }
        if !(1..=MAX_QUERY_CIPHERTEXTS).contains(&self.max_query_ciphertexts) {
            return Err(pir_err!(
                InvalidParameters,
                "max_query_ciphertexts must be in 1..={}, got {}",
                MAX_QUERY_CIPHERTEXTS,
                self.max_query_ciphertexts
            ));
        }
        if self.shards == 0 {
            return Err(pir_err!(InvalidParameters, "shards must be positive"));
        }
        Ok(())
    }
}

/// Protocol parameters shared by client and server
///
/// Only the inputs and planner decisions are stored; sizes derived from them
/// are methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PirParams {
    pub num_items: u64,
    pub item_bytes: usize,
    /// Scheme parameters: N, q, logt, t, σ, gadget
    pub rlwe: RlweParams,
    /// Hypercube side lengths, dimension 0 first
    pub dimension_sizes: Vec<usize>,
    pub items_per_plaintext: usize,
    pub shards: usize,
}

impl PirParams {
    /// Polynomial degree N, the coefficient count of one plaintext
    pub fn plaintext_coeff_count(&self) -> usize {
        self.rlwe.ring_dim
    }

    /// logt
    pub fn plaintext_bits(&self) -> u32 {
        self.rlwe.plaintext_bits
    }

    pub fn dimension_count(&self) -> usize {
        self.dimension_sizes.len()
    }

    /// Coefficients one item occupies: ceil(8 · item_bytes / logt)
    pub fn coeffs_per_item(&self) -> usize {
        coeffs_per_item(self.item_bytes, self.rlwe.plaintext_bits)
    }

    /// Plaintexts one item spans (columns of the database)
    pub fn plaintexts_per_item(&self) -> usize {
        self.coeffs_per_item().div_ceil(self.rlwe.ring_dim)
    }

    /// Items held by each shard (the last shard may be short)
    pub fn items_per_shard(&self) -> u64 {
        self.num_items.div_ceil(self.shards as u64)
    }

    /// Plaintexts (rows) needed by one shard
    pub fn plaintexts_per_shard(&self) -> usize {
        self.items_per_shard().div_ceil(self.items_per_plaintext as u64) as usize
    }

    /// ∏ dimension_sizes
    pub fn hypercube_capacity(&self) -> usize {
        self.dimension_sizes.iter().product()
    }

    /// Independent hypercubes the server reduces: shards × columns
    pub fn hypercube_count(&self) -> usize {
        self.shards * self.plaintexts_per_item()
    }

    /// Σ dimension_sizes, the one-hot slots a query carries
    pub fn query_slots(&self) -> usize {
        self.dimension_sizes.iter().sum()
    }

    /// Ciphertexts in one query
    pub fn query_ciphertexts(&self) -> usize {
        self.query_slots().div_ceil(self.rlwe.ring_dim)
    }

    /// Slots carried by query ciphertext `k`
    pub fn slots_in_ciphertext(&self, k: usize) -> usize {
        let n = self.rlwe.ring_dim;
        self.query_slots().saturating_sub(k * n).min(n)
    }

    /// Expansion doubling steps for query ciphertext `k`
    pub fn levels_for_ciphertext(&self, k: usize) -> u32 {
        ceil_log2(self.slots_in_ciphertext(k))
    }

    /// Deepest expansion over all query ciphertexts
    pub fn expansion_levels(&self) -> u32 {
        ceil_log2(self.query_slots().min(self.rlwe.ring_dim))
    }

    /// Galois elements the client must provide keys for
    pub fn galois_elements(&self) -> Vec<usize> {
        expansion_galois_elements(self.rlwe.ring_dim, self.expansion_levels())
    }

    /// Plaintexts a ciphertext turns into between reduction rounds (F)
    pub fn expansion_ratio(&self) -> usize {
        self.rlwe.expansion_ratio()
    }

    /// Reply ciphertexts per hypercube: F^(d-1)
    pub fn reply_ciphertexts_per_hypercube(&self) -> usize {
        self.expansion_ratio().pow(self.dimension_count() as u32 - 1)
    }

    /// Total reply ciphertexts
    pub fn reply_ciphertexts(&self) -> usize {
        self.hypercube_count() * self.reply_ciphertexts_per_hypercube()
    }

    /// log2 of the expected reply noise under these parameters
    pub fn reply_noise_bits(&self) -> f64 {
        let widest = self.dimension_sizes.iter().copied().max().unwrap_or(1);
        self.rlwe.reply_noise_bits(self.expansion_levels(), widest)
    }

    /// Check every invariant tying the fields together, decryptability included
    pub fn validate(&self) -> Result<()> {
        self.rlwe
            .validate()
            .map_err(|e| pir_err!(InvalidParameters, "{}", e))?;
        if self.num_items == 0 || self.item_bytes == 0 {
            return Err(pir_err!(InvalidParameters, "empty database or zero-size items"));
        }
        if self.dimension_sizes.is_empty() || self.dimension_sizes.len() > MAX_DIMENSION_COUNT {
            return Err(pir_err!(
                InvalidParameters,
                "dimension_count {} outside 1..={}",
                self.dimension_sizes.len(),
                MAX_DIMENSION_COUNT
            ));
        }
        if self.dimension_sizes.contains(&0) {
            return Err(pir_err!(InvalidParameters, "zero-length dimension"));
        }
        if self.shards == 0 || self.shards as u64 > self.num_items {
            return Err(pir_err!(InvalidParameters, "shards must be in 1..=num_items"));
        }
        let n = self.rlwe.ring_dim;
        let cpi = self.coeffs_per_item();
        let max_ipp = if cpi <= n { n / cpi } else { 1 };
        if self.items_per_plaintext == 0 || self.items_per_plaintext > max_ipp {
            return Err(pir_err!(
                InvalidParameters,
                "items_per_plaintext {} outside 1..={}",
                self.items_per_plaintext,
                max_ipp
            ));
        }
        let capacity = self
            .dimension_sizes
            .iter()
            .try_fold(1usize, |acc, &s| acc.checked_mul(s))
            .ok_or_else(|| pir_err!(InvalidParameters, "hypercube capacity overflows"))?;
        if capacity < self.plaintexts_per_shard() {
            return Err(pir_err!(
                InvalidParameters,
                "hypercube capacity {} below {} plaintexts",
                capacity,
                self.plaintexts_per_shard()
            ));
        }
        if self.query_ciphertexts() > MAX_QUERY_CIPHERTEXTS {
            return Err(pir_err!(
                InvalidParameters,
                "{} query slots need {} ciphertexts, limit {}",
                self.query_slots(),
                self.query_ciphertexts(),
                MAX_QUERY_CIPHERTEXTS
            ));
        }
        let estimate = self.reply_noise_bits();
        let ceiling = self.rlwe.noise_ceiling_bits();
        if estimate + NOISE_MARGIN_BITS > ceiling {
            return Err(pir_err!(
                InvalidParameters,
                "reply noise {:.1} bits exceeds the {:.1}-bit ceiling",
                estimate,
                ceiling - NOISE_MARGIN_BITS
            ));
        }
        Ok(())
    }

    /// Serialize for sharing between processes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize and re-validate
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let params: Self = bincode::deserialize(bytes)?;
        params.validate().map_err(|e| match e {
            PirError::InvalidParameters(msg) => PirError::DeserializationError(msg),
            other => other,
        })?;
        Ok(params)
    }
}

/// Plan parameters with the default search
pub fn plan(num_items: u64, item_bytes: usize) -> Result<PirParams> {
    plan_with(num_items, item_bytes, &PlanConfig::default())
}

/// Plan parameters honoring the overrides in `config`
///
/// The search runs over dimension count (ascending, outermost), ring
/// dimension (ascending) and plaintext width (descending). The first
/// configuration that fits the query budget and the noise ceiling wins.
pub fn plan_with(num_items: u64, item_bytes: usize, config: &PlanConfig) -> Result<PirParams> {
    config.check()?;
    if num_items == 0 {
        return Err(pir_err!(InvalidParameters, "num_items must be positive"));
    }
    if item_bytes == 0 {
        return Err(pir_err!(InvalidParameters, "item_bytes must be positive"));
    }
    if config.shards as u64 > num_items {
        return Err(pir_err!(
            InvalidParameters,
            "{} shards for {} items",
            config.shards,
            num_items
        ));
    }

    let dims: Vec<usize> = match config.dimension_count {
        Some(d) => vec![d],
        None => (1..=MAX_DIMENSION_COUNT).collect(),
    };
    let degrees: Vec<usize> = match config.poly_degree {
        Some(n) => vec![n],
        None => DEFAULT_POLY_DEGREES.to_vec(),
    };
    let widths: Vec<u32> = match config.plaintext_bits {
        Some(bits) => vec![bits],
        None => DEFAULT_PLAINTEXT_BITS.to_vec(),
    };

    let items_per_shard = num_items.div_ceil(config.shards as u64);

    for &d in &dims {
        for &n in &degrees {
            for &bits in &widths {
                let rlwe = RlweParams::new(n, bits);
                let cpi = coeffs_per_item(item_bytes, bits);
                let mut ipp = if cpi <= n { n / cpi } else { 1 };
                if let Some(cap) = config.max_items_per_plaintext {
                    ipp = ipp.min(cap);
                }

                let Ok(plaintexts) = usize::try_from(items_per_shard.div_ceil(ipp as u64)) else {
                    continue;
                };
                let Some(sizes) = dimension_sizes(plaintexts, d) else {
                    continue;
                };

                let slots: usize = sizes.iter().sum();
                if slots > n * config.max_query_ciphertexts {
                    continue;
                }

                let params = PirParams {
                    num_items,
                    item_bytes,
                    rlwe,
                    dimension_sizes: sizes,
                    items_per_plaintext: ipp,
                    shards: config.shards,
                };
                let estimate = params.reply_noise_bits();
                if estimate + NOISE_MARGIN_BITS > params.rlwe.noise_ceiling_bits() {
                    continue;
                }
                debug!(
                    num_items,
                    item_bytes,
                    ring_dim = n,
                    plaintext_bits = bits,
                    dims = ?params.dimension_sizes,
                    noise_bits = estimate,
                    "planned parameters"
                );
                return Ok(params);
            }
        }
    }

    Err(pir_err!(
        InvalidParameters,
        "no configuration fits {} items of {} bytes within the noise budget",
        num_items,
        item_bytes
    ))
}

fn coeffs_per_item(item_bytes: usize, plaintext_bits: u32) -> usize {
    (8 * item_bytes).div_ceil(plaintext_bits as usize)
}

/// ceil(log2(x)); 0 for x ≤ 1
fn ceil_log2(x: usize) -> u32 {
    if x <= 1 {
        0
    } else {
        usize::BITS - (x - 1).leading_zeros()
    }
}

/// Near-cubic side lengths whose product covers `plaintexts`
///
/// All sides start at max(2, ⌊P^(1/d)⌋) and grow by one, dimension 0 first,
/// until the product reaches P. `None` on overflow.
fn dimension_sizes(plaintexts: usize, d: usize) -> Option<Vec<usize>> {
    if d == 1 {
        return Some(vec![plaintexts.max(1)]);
    }

    let mut root = (plaintexts as f64).powf(1.0 / d as f64).floor() as usize;
    while root > 1 && root.checked_pow(d as u32).map_or(true, |p| p > plaintexts) {
        root -= 1;
    }
    while (root + 1).checked_pow(d as u32).is_some_and(|p| p <= plaintexts) {
        root += 1;
    }

    let mut sizes = vec![root.max(2); d];
    let mut i = 0;
    while sizes.iter().try_fold(1usize, |acc, &s| acc.checked_mul(s))? < plaintexts {
        sizes[i] += 1;
        i = (i + 1) % d;
    }
    Some(sizes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn go_config() -> PlanConfig {
        PlanConfig {
            poly_degree: Some(2048),
            plaintext_bits: Some(12),
            dimension_count: Some(2),
            ..PlanConfig::default()
        }
    }

    #[test]
    fn test_dimension_sizes_shapes() {
        assert_eq!(dimension_sizes(16, 2), Some(vec![4, 4]));
        assert_eq!(dimension_sizes(410, 2), Some(vec![21, 20]));
        assert_eq!(dimension_sizes(17, 2), Some(vec![5, 4]));
        assert_eq!(dimension_sizes(1, 2), Some(vec![2, 2]));
        assert_eq!(dimension_sizes(1000, 3), Some(vec![10, 10, 10]));
        assert_eq!(dimension_sizes(7, 1), Some(vec![7]));
    }

    #[test]
    fn test_ceil_log2() {
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(41), 6);
        assert_eq!(ceil_log2(2048), 11);
    }

    #[test]
    fn test_plan_go_configuration() {
        let params = plan_with(4096, 288, &go_config()).unwrap();
        assert_eq!(params.coeffs_per_item(), 192);
        assert_eq!(params.items_per_plaintext, 10);
        assert_eq!(params.dimension_sizes, vec![21, 20]);
        assert_eq!(params.expansion_levels(), 6);
        assert_eq!(params.query_ciphertexts(), 1);
        assert_eq!(params.reply_ciphertexts(), 10);
        assert_eq!(params.galois_elements(), vec![2049, 1025, 513, 257, 129, 65]);
    }

    #[test]
    fn test_concrete_scenario_shape() {
        let config = PlanConfig {
            dimension_count: Some(2),
            max_items_per_plaintext: Some(1),
            ..PlanConfig::default()
        };
        let params = plan_with(16, 32, &config).unwrap();
        assert_eq!(params.dimension_sizes, vec![4, 4]);
        assert_eq!(params.items_per_plaintext, 1);
    }

    #[test]
    fn test_default_plan_prefers_fewest_dimensions() {
        let params = plan(4096, 288).unwrap();
        assert_eq!(params.dimension_count(), 1);
        assert!(params.hypercube_capacity() * params.items_per_plaintext >= 4096);
        params.validate().unwrap();
    }

    #[test]
    fn test_capacity_and_monotone_dimensions() {
        let mut previous = usize::MAX;
        for num_items in [1_000_000u64, 200_000, 50_000, 4096, 100, 1] {
            let params = plan(num_items, 64).unwrap();
            assert!(
                (params.hypercube_capacity() * params.items_per_plaintext) as u64 >= num_items
            );
            assert!(params.dimension_count() <= previous);
            previous = params.dimension_count();
        }
    }

    #[test]
    fn test_wide_plaintexts_rejected() {
        let config = PlanConfig {
            plaintext_bits: Some(20),
            ..go_config()
        };
        assert!(matches!(
            plan_with(4096, 288, &config),
            Err(PirError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_bad_inputs_rejected() {
        assert!(plan(0, 32).is_err());
        assert!(plan(16, 0).is_err());

        let bad = [
            PlanConfig { poly_degree: Some(3000), ..PlanConfig::default() },
            PlanConfig { plaintext_bits: Some(2), ..PlanConfig::default() },
            PlanConfig { dimension_count: Some(0), ..PlanConfig::default() },
            PlanConfig { dimension_count: Some(9), ..PlanConfig::default() },
            PlanConfig { shards: 0, ..PlanConfig::default() },
            PlanConfig { max_query_ciphertexts: 0, ..PlanConfig::default() },
            PlanConfig { shards: 32, ..PlanConfig::default() },
        ];
        for config in &bad {
            assert!(
                matches!(plan_with(16, 32, config), Err(PirError::InvalidParameters(_))),
                "{:?}",
                config
            );
        }
    }

    #[test]
    fn test_query_budget_limits_slots() {
        // 300 single-item plaintexts need 300 slots, more than one N = 256 ciphertext
        let tight = PlanConfig {
            poly_degree: Some(256),
            plaintext_bits: Some(10),
            dimension_count: Some(1),
            max_items_per_plaintext: Some(1),
            ..PlanConfig::default()
        };
        assert!(plan_with(300, 8, &tight).is_err());

        let loose = PlanConfig { max_query_ciphertexts: 2, ..tight };
        let params = plan_with(300, 8, &loose).unwrap();
        assert_eq!(params.query_ciphertexts(), 2);
        assert_eq!(params.slots_in_ciphertext(0), 256);
        assert_eq!(params.slots_in_ciphertext(1), 44);
        assert_eq!(params.levels_for_ciphertext(1), 6);
        assert_eq!(params.expansion_levels(), 8);
    }

    #[test]
    fn test_params_bytes_roundtrip_and_revalidation() {
        let params = plan_with(4096, 288, &go_config()).unwrap();
        let bytes = params.to_bytes().unwrap();
        assert_eq!(PirParams::from_bytes(&bytes).unwrap(), params);

        let mut broken = params.clone();
        broken.dimension_sizes = vec![2, 2];
        let bytes = broken.to_bytes().unwrap();
        assert!(matches!(
            PirParams::from_bytes(&bytes),
            Err(PirError::DeserializationError(_))
        ));

        assert!(matches!(
            PirParams::from_bytes(&[1, 2, 3]),
            Err(PirError::DeserializationError(_))
        ));
    }

    #[test]
    fn test_shared_params_over_noise_budget_rejected() {
        let config = PlanConfig {
            poly_degree: Some(2048),
            plaintext_bits: Some(10),
            dimension_count: Some(1),
            ..PlanConfig::default()
        };
        let params = plan_with(4000, 64, &config).unwrap();
        params.validate().unwrap();

        // Same layout, but 28-bit plaintexts leave no room for the reply noise
        let mut wide = params.clone();
        wide.rlwe = RlweParams::new(2048, 28);
        assert!(wide.reply_noise_bits() + NOISE_MARGIN_BITS > wide.rlwe.noise_ceiling_bits());
        assert!(matches!(wide.validate(), Err(PirError::InvalidParameters(_))));
        assert!(matches!(
            PirParams::from_bytes(&wide.to_bytes().unwrap()),
            Err(PirError::DeserializationError(_))
        ));
    }

    #[test]
    fn test_query_ciphertext_limit() {
        let config = PlanConfig {
            max_query_ciphertexts: MAX_QUERY_CIPHERTEXTS + 1,
            ..PlanConfig::default()
        };
        assert!(matches!(
            plan_with(100, 8, &config),
            Err(PirError::InvalidParameters(_))
        ));

        let mut params = plan_with(16, 32, &go_config()).unwrap();
        params.dimension_sizes = vec![2048 * MAX_QUERY_CIPHERTEXTS + 1];
        assert_eq!(params.query_ciphertexts(), MAX_QUERY_CIPHERTEXTS + 1);
        assert!(matches!(params.validate(), Err(PirError::InvalidParameters(msg)) if msg.contains("ciphertexts")));
    }

    #[test]
    fn test_fewer_dimensions_beat_wider_plaintexts() {
        // d = 1 only fits at logt = 8; the dimension count is minimized first
        let params = plan(200_000, 8).unwrap();
        assert_eq!(params.dimension_count(), 1);
        assert_eq!(params.plaintext_coeff_count(), 2048);
        assert_eq!(params.plaintext_bits(), 8);
    }

    #[test]
    fn test_config_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(&path, r#"{ "poly_degree": 4096, "shards": 2 }"#).unwrap();

        let config = PlanConfig::from_json_file(&path).unwrap();
        assert_eq!(config.poly_degree, Some(4096));
        assert_eq!(config.shards, 2);
        assert_eq!(config.max_query_ciphertexts, 1);

        std::fs::write(&path, "not json").unwrap();
        assert!(PlanConfig::from_json_file(&path).is_err());
        assert!(PlanConfig::from_json_file(dir.path().join("missing.json")).is_err());
    }
}
