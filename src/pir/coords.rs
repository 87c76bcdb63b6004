//! Index arithmetic shared by client and server
//!
//! A flat item index resolves to a shard, a plaintext row inside that shard's
//! hypercube, the row's mixed-radix coordinates and the item's position
//! inside the plaintext. Nothing here depends on encryption.

use serde::{Deserialize, Serialize};

use super::error::{PirError, Result};
use super::plan::PirParams;

/// Where an item lives in the packed database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Shard holding the item
    pub shard: usize,
    /// Row-major plaintext index inside the shard's hypercube
    pub plaintext_index: usize,
    /// One coordinate per dimension, dimension 0 most significant
    pub coords: Vec<usize>,
    /// Item slot inside the plaintext (multiply by coeffs_per_item for the
    /// coefficient offset)
    pub offset: usize,
}

impl Coordinates {
    /// Resolve `index`, failing with `IndexOutOfRange` past the last item
    pub fn for_index(index: u64, params: &PirParams) -> Result<Self> {
        if index >= params.num_items {
            return Err(PirError::IndexOutOfRange {
                index,
                num_items: params.num_items,
            });
        }

        let per_shard = params.items_per_shard();
        let shard = (index / per_shard) as usize;
        let local = (index % per_shard) as usize;
        let plaintext_index = local / params.items_per_plaintext;

        Ok(Self {
            shard,
            plaintext_index,
            coords: mixed_radix(plaintext_index, &params.dimension_sizes),
            offset: local % params.items_per_plaintext,
        })
    }

    /// First coefficient of the item inside its (column-concatenated) plaintext
    pub fn coeff_offset(&self, params: &PirParams) -> usize {
        self.offset * params.coeffs_per_item()
    }
}

/// Row-major mixed-radix digits of `flat`; the last dimension varies fastest
pub fn mixed_radix(mut flat: usize, dimension_sizes: &[usize]) -> Vec<usize> {
    let mut coords = vec![0; dimension_sizes.len()];
    for (coord, &size) in coords.iter_mut().zip(dimension_sizes).rev() {
        *coord = flat % size;
        flat /= size;
    }
    coords
}

/// Inverse of [`mixed_radix`]
pub fn flat_index(coords: &[usize], dimension_sizes: &[usize]) -> usize {
    coords
        .iter()
        .zip(dimension_sizes)
        .fold(0, |acc, (&c, &size)| acc * size + c)
}
