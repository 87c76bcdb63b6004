//! Database encoding for PIR
//!
//! Items are bit-packed into plaintext coefficients and laid out as one
//! hypercube per (shard, column).
//!
//! # Coefficient Encoding
//!
//! Item bytes are read as a little-endian bit stream and cut into logt-bit
//! coefficients, so each item takes `coeffs_per_item` whole coefficients and
//! no coefficient carries bits of two items.
//!
//! - Small items: `items_per_plaintext` items share a plaintext, item k at
//!   coefficient `(k % items_per_plaintext) * coeffs_per_item`
//! - Large items: one item per row, its coefficient stream cut into
//!   N-coefficient columns, column c in hypercube `shard * columns + c`
//!
//! Hypercube rows past the last item are zero plaintexts.

use rayon::prelude::*;
use tracing::debug;

use crate::engine::RlweEngine;
use crate::math::Poly;

use super::error::{pir_err, Result};
use super::plan::PirParams;

/// The server's preprocessed database
///
/// Plaintexts are kept in the NTT domain, ready for ciphertext-plaintext
/// products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedDatabase {
    /// `shards * plaintexts_per_item` hypercubes of `hypercube_capacity` rows
    hypercubes: Vec<Vec<Poly>>,
    /// Number of real items packed
    num_items: u64,
}

impl PackedDatabase {
    /// Rows of hypercube `cube`, row-major
    pub fn hypercube(&self, cube: usize) -> &[Poly] {
        &self.hypercubes[cube]
    }

    pub fn hypercubes(&self) -> &[Vec<Poly>] {
        &self.hypercubes
    }

    pub fn hypercube_count(&self) -> usize {
        self.hypercubes.len()
    }

    /// Total plaintexts across every hypercube, padding included
    pub fn plaintext_count(&self) -> usize {
        self.hypercubes.iter().map(Vec::len).sum()
    }

    /// Items actually supplied at packing time
    pub fn num_items(&self) -> u64 {
        self.num_items
    }
}

/// Pack a concatenation of `item_bytes`-sized items
///
/// A trailing partial item is zero-padded.
pub fn pack(raw: &[u8], params: &PirParams) -> Result<PackedDatabase> {
    let capacity = params.num_items as u128 * params.item_bytes as u128;
    if raw.len() as u128 > capacity {
        return Err(pir_err!(
            CapacityExceeded,
            "{} bytes supplied, room for {}",
            raw.len(),
            capacity
        ));
    }
    let items: Vec<&[u8]> = raw.chunks(params.item_bytes).collect();
    pack_items(&items, params)
}

/// Pack items given one by one
///
/// Items shorter than `item_bytes` are zero-padded and read back padded.
pub fn pack_items<T: AsRef<[u8]> + Sync>(items: &[T], params: &PirParams) -> Result<PackedDatabase> {
    if items.len() as u64 > params.num_items {
        return Err(pir_err!(
            CapacityExceeded,
            "{} items supplied for {} slots",
            items.len(),
            params.num_items
        ));
    }
    if let Some((k, len)) = items
        .iter()
        .map(|item| item.as_ref().len())
        .enumerate()
        .find(|&(_, len)| len > params.item_bytes)
    {
        return Err(pir_err!(
            CapacityExceeded,
            "item {} is {} bytes, limit {}",
            k,
            len,
            params.item_bytes
        ));
    }

    let engine = RlweEngine::new(params.rlwe.clone());
    let start = std::time::Instant::now();

    let columns = params.plaintexts_per_item();
    let rows = params.hypercube_capacity();
    let n = params.plaintext_coeff_count();

    let hypercubes: Vec<Vec<Poly>> = (0..params.hypercube_count())
        .into_par_iter()
        .map(|cube| {
            let shard = cube / columns;
            let column = cube % columns;
            (0..rows)
                .into_par_iter()
                .map(|row| {
                    let coeffs = row_coefficients(items, params, shard, column, row);
                    debug_assert!(coeffs.len() <= n);
                    engine.prepare_plaintext(&coeffs)
                })
                .collect()
        })
        .collect();

    debug!(
        items = items.len(),
        hypercubes = hypercubes.len(),
        rows,
        elapsed = ?start.elapsed(),
        "packed database"
    );

    Ok(PackedDatabase {
        hypercubes,
        num_items: items.len() as u64,
    })
}

/// Coefficients of one plaintext row
fn row_coefficients<T: AsRef<[u8]>>(
    items: &[T],
    params: &PirParams,
    shard: usize,
    column: usize,
    row: usize,
) -> Vec<u64> {
    let n = params.plaintext_coeff_count();
    let bits = params.plaintext_bits();
    let cpi = params.coeffs_per_item();
    let per_shard = params.items_per_shard() as usize;
    let ipp = params.items_per_plaintext;

    let shard_start = shard * per_shard;
    let shard_end = (shard_start + per_shard).min(items.len());
    let first = shard_start + row * ipp;
    if first >= shard_end {
        return Vec::new();
    }

    let mut coeffs = Vec::with_capacity(n);
    for item in &items[first..(first + ipp).min(shard_end)] {
        let mut item_coeffs = bytes_to_coeffs(item.as_ref(), bits);
        item_coeffs.resize(cpi, 0);
        let lo = (column * n).min(cpi);
        let hi = ((column + 1) * n).min(cpi);
        coeffs.extend_from_slice(&item_coeffs[lo..hi]);
    }
    coeffs
}

/// Cut bytes into `bits`-bit coefficients, little-endian bit order
///
/// The last coefficient is zero-padded at the top.
pub fn bytes_to_coeffs(bytes: &[u8], bits: u32) -> Vec<u64> {
    let mask = (1u64 << bits) - 1;
    let mut coeffs = Vec::with_capacity((bytes.len() * 8).div_ceil(bits as usize));
    let mut acc = 0u64;
    let mut held = 0u32;

    for &byte in bytes {
        acc |= (byte as u64) << held;
        held += 8;
        while held >= bits {
            coeffs.push(acc & mask);
            acc >>= bits;
            held -= bits;
        }
    }
    if held > 0 {
        coeffs.push(acc & mask);
    }
    coeffs
}

/// Inverse of [`bytes_to_coeffs`]: the first `len` bytes of the bit stream
///
/// Missing coefficients read as zero.
pub fn coeffs_to_bytes(coeffs: &[u64], bits: u32, len: usize) -> Vec<u8> {
    let mask = (1u64 << bits) - 1;
    let mut bytes = Vec::with_capacity(len);
    let mut acc = 0u64;
    let mut held = 0u32;
    let mut source = coeffs.iter();

    while bytes.len() < len {
        while held < 8 {
            let next = source.next().copied().unwrap_or(0) & mask;
            acc |= next << held;
            held += bits;
        }
        bytes.push((acc & 0xFF) as u8);
        acc >>= 8;
        held -= 8;
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pir::plan::{plan_with, PlanConfig};

    fn small_config() -> PlanConfig {
        PlanConfig {
            poly_degree: Some(256),
            plaintext_bits: Some(12),
            dimension_count: Some(2),
            ..PlanConfig::default()
        }
    }

    #[test]
    fn test_bit_packing_roundtrip_odd_widths() {
        let bytes: Vec<u8> = (0..37u8).map(|i| i.wrapping_mul(73)).collect();
        for bits in [4, 7, 10, 12, 16, 20] {
            let coeffs = bytes_to_coeffs(&bytes, bits);
            assert_eq!(coeffs.len(), (37 * 8usize).div_ceil(bits as usize));
            assert!(coeffs.iter().all(|&c| c < 1 << bits));
            assert_eq!(coeffs_to_bytes(&coeffs, bits, bytes.len()), bytes);
        }
    }

    #[test]
    fn test_bit_packing_layout() {
        // 0xABC lands in the low 12 bits, little-endian
        assert_eq!(bytes_to_coeffs(&[0xBC, 0x0A], 12), vec![0xABC, 0]);
        assert_eq!(coeffs_to_bytes(&[0xABC], 12, 2), vec![0xBC, 0x0A]);
        assert!(coeffs_to_bytes(&[], 12, 0).is_empty());
    }

    #[test]
    fn test_pack_shape_and_padding() {
        let params = plan_with(50, 32, &small_config()).unwrap();
        // 22 coefficients per item, 11 items per plaintext, 5 plaintexts
        assert_eq!(params.coeffs_per_item(), 22);
        assert_eq!(params.items_per_plaintext, 11);

        let raw: Vec<u8> = (0..50 * 32).map(|i| (i % 251) as u8).collect();
        let db = pack(&raw, &params).unwrap();
        assert_eq!(db.hypercube_count(), 1);
        assert_eq!(db.plaintext_count(), params.hypercube_capacity());
        assert_eq!(db.num_items(), 50);

        // Rows beyond the fifth are zero plaintexts
        assert!(db.hypercube(0)[5..].iter().all(|p| p.is_zero()));
        assert!(!db.hypercube(0)[4].is_zero());
    }

    #[test]
    fn test_row_layout_places_items_at_offsets() {
        let params = plan_with(50, 32, &small_config()).unwrap();
        let items: Vec<Vec<u8>> = (0..50u8).map(|k| vec![k; 32]).collect();

        let row = row_coefficients(&items, &params, 0, 0, 1);
        assert_eq!(row.len(), 11 * 22);
        let item_14 = &row[3 * 22..4 * 22];
        assert_eq!(coeffs_to_bytes(item_14, 12, 32), vec![14u8; 32]);

        // Last row holds items 44..50 only
        assert_eq!(row_coefficients(&items, &params, 0, 0, 4).len(), 6 * 22);
        assert!(row_coefficients(&items, &params, 0, 0, 5).is_empty());
    }

    #[test]
    fn test_large_items_span_columns() {
        // 600 bytes at 12 bits is 400 coefficients: two N = 256 columns
        let config = PlanConfig {
            dimension_count: Some(1),
            ..small_config()
        };
        let params = plan_with(6, 600, &config).unwrap();
        assert_eq!(params.plaintexts_per_item(), 2);
        assert_eq!(params.items_per_plaintext, 1);

        let items: Vec<Vec<u8>> = (0..6u8).map(|k| vec![k + 1; 600]).collect();
        let first = row_coefficients(&items, &params, 0, 0, 2);
        let second = row_coefficients(&items, &params, 0, 1, 2);
        assert_eq!(first.len(), 256);
        assert_eq!(second.len(), 144);

        let joined: Vec<u64> = first.into_iter().chain(second).collect();
        assert_eq!(coeffs_to_bytes(&joined, 12, 600), vec![3u8; 600]);

        let db = pack_items(&items, &params).unwrap();
        assert_eq!(db.hypercube_count(), 2);
    }

    #[test]
    fn test_shards_split_items() {
        let config = PlanConfig {
            shards: 2,
            max_items_per_plaintext: Some(1),
            ..small_config()
        };
        let params = plan_with(10, 16, &config).unwrap();
        let items: Vec<Vec<u8>> = (0..10u8).map(|k| vec![k; 16]).collect();

        // Shard 1 starts at item 5
        let row = row_coefficients(&items, &params, 1, 0, 0);
        assert_eq!(coeffs_to_bytes(&row, 12, 16), vec![5u8; 16]);
        assert!(row_coefficients(&items, &params, 1, 0, 5).is_empty());

        let db = pack_items(&items, &params).unwrap();
        assert_eq!(db.hypercube_count(), 2);
    }

    #[test]
    fn test_pack_is_deterministic() {
        let params = plan_with(50, 32, &small_config()).unwrap();
        let raw: Vec<u8> = (0..50 * 32).map(|i| (i * 7 % 256) as u8).collect();
        assert_eq!(pack(&raw, &params).unwrap(), pack(&raw, &params).unwrap());
    }

    #[test]
    fn test_capacity_exceeded() {
        let params = plan_with(4, 8, &small_config()).unwrap();
        assert!(matches!(
            pack(&[0u8; 33], &params),
            Err(crate::pir::PirError::CapacityExceeded(_))
        ));

        let too_many = vec![vec![0u8; 8]; 5];
        assert!(pack_items(&too_many, &params).is_err());

        let too_long = vec![vec![0u8; 9]];
        assert!(pack_items(&too_long, &params).is_err());

        // Fewer items than planned is fine
        assert!(pack(&[1u8; 20], &params).is_ok());
    }
}
