//! Pair-distance database (§4.2)
//!
//! A k-vector index over every catalog star-pair distance within
//! `[min_distance, max_distance]`, followed by the bulk array of catalog
//! index pairs those distances belong to, sorted the same way. Grounded on
//! `lost`'s `PairDistanceKVectorDatabase` / `CatalogToPairDistances`
//! (`databases.hpp`/`.cpp`), with the raw-pointer bulk array replaced by a
//! borrowed slice (§5, §9 "raw pointer indexing into buffer").

use crate::catalog::Catalog;
use crate::errors::{LostError, Result};
use crate::geometry::angle;
use crate::kvector::KVectorIndex;
use crate::serialize::{ByteReader, ByteWriter, Endianness};

/// Magic value for a pair-distance database inside a [`crate::multidb::MultiDatabase`].
pub const PAIR_DISTANCE_MAGIC: u32 = 0x2536_F009;

/// Serialize a pair-distance database over every catalog pair whose angular
/// separation falls in `[min_distance, max_distance]`.
pub fn build(writer: &mut ByteWriter, catalog: &Catalog, min_distance: f32, max_distance: f32, num_bins: usize) {
    let mut pairs: Vec<(f32, u16, u16)> = Vec::new();
    let n = catalog.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let d = angle(&catalog[i].spatial, &catalog[j].spatial) as f32;
            if d >= min_distance && d <= max_distance {
                pairs.push((d, i as u16, j as u16));
            }
        }
    }
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("distances must not be NaN"));

    let distances: Vec<f32> = pairs.iter().map(|p| p.0).collect();
    crate::kvector::build(writer, &distances, min_distance, max_distance, num_bins);

    for &(_, i, j) in &pairs {
        writer.write_i16(i as i16);
        writer.write_i16(j as i16);
    }
}

/// A deserialized, read-only view over a pair-distance database.
#[derive(Debug, Clone, Copy)]
pub struct PairDistanceDatabase<'a> {
    index: KVectorIndex<'a>,
    pairs: &'a [u8],
    endian: Endianness,
}

impl<'a> PairDistanceDatabase<'a> {
    /// Parse a pair-distance database starting at the reader's current
    /// position. Leaves the reader positioned just past the bulk pair array.
    pub fn read(reader: &mut ByteReader<'a>) -> Result<Self> {
        let endian = reader.endian();
        let index = KVectorIndex::read(reader)?;
        let num_pairs = index.num_values();
        if num_pairs < 0 {
            return Err(LostError::DatabaseCorrupt("negative pair count".to_string()));
        }
        let pairs = reader.read_raw(4 * num_pairs as usize)?;
        Ok(PairDistanceDatabase { index, pairs, endian })
    }

    pub fn min_distance(&self) -> f32 {
        self.index.min()
    }

    pub fn max_distance(&self) -> f32 {
        self.index.max()
    }

    pub fn num_pairs(&self) -> i64 {
        self.index.num_values()
    }

    fn pair_at(&self, i: usize) -> (u16, u16) {
        use byteorder::{BigEndian, ByteOrder, LittleEndian};
        let off = i * 4;
        let (a, b) = match self.endian {
            Endianness::Little => (
                LittleEndian::read_i16(&self.pairs[off..off + 2]),
                LittleEndian::read_i16(&self.pairs[off + 2..off + 4]),
            ),
            Endianness::Big => (
                BigEndian::read_i16(&self.pairs[off..off + 2]),
                BigEndian::read_i16(&self.pairs[off + 2..off + 4]),
            ),
        };
        (a as u16, b as u16)
    }

    /// Every stored pair whose distance lies in `[q_min, q_max]`, and
    /// possibly some just outside that range (§4.1/§4.2 liberal semantics).
    pub fn find_pairs_liberal(&self, q_min: f32, q_max: f32) -> Vec<(u16, u16)> {
        let (start, count) = self.index.query_liberal(q_min, q_max);
        (start..start + count).map(|i| self.pair_at(i)).collect()
    }

    /// Like [`Self::find_pairs_liberal`], but drops leading/trailing entries
    /// whose recomputed distance (via `catalog`) falls outside
    /// `[q_min, q_max]`. The surviving range is contiguous because the
    /// underlying array is sorted by distance.
    pub fn find_pairs_exact(&self, catalog: &Catalog, q_min: f32, q_max: f32) -> Vec<(u16, u16)> {
        self.find_pairs_liberal(q_min, q_max)
            .into_iter()
            .filter(|&(i, j)| {
                let d = angle(&catalog[i as usize].spatial, &catalog[j as usize].spatial) as f32;
                d >= q_min && d <= q_max
            })
            .collect()
    }

    /// Distances from `star` (a catalog index) to every star it is paired
    /// with in this database. Diagnostic only (§4.2).
    pub fn star_distances(&self, star: u16, catalog: &Catalog) -> Vec<f32> {
        let mut result = Vec::new();
        for i in 0..self.num_pairs() as usize {
            let (a, b) = self.pair_at(i);
            if a == star || b == star {
                result.push(angle(&catalog[a as usize].spatial, &catalog[b as usize].spatial) as f32);
            }
        }
        result
    }
}
