//! K-vector index: a uniform-bin prefix-count index over a sorted array
//!
//! Grounded on `lost`'s `KVectorIndex`/`SerializeKVectorIndex`
//! (`databases.hpp`/`.cpp`). The index never stores the sorted data itself --
//! only `numValues`, the `[min, max)` range, and `numBins + 1` prefix counts
//! -- so it can sit in front of any sorted `f32` array (pair distances here,
//! but the same shape would serve triple distances too).
//!
//! # Wire layout
//!
//! ```text
//! int32 numValues | float32 min | float32 max | int32 numBins | (numBins+1) x int32 bins
//! ```

use crate::errors::{LostError, Result};
use crate::serialize::{ByteReader, ByteWriter, Endianness};

/// Serialized length, in bytes, of a k-vector index with `num_bins` bins.
pub fn serialized_len(num_bins: usize) -> usize {
    4 + 4 + 4 + 4 + 4 * (num_bins + 1)
}

/// Write a k-vector index over `values` (which must be sorted ascending,
/// with `min <= values[0]` and `values[last] <= max`; an empty slice is
/// allowed and produces an index whose every bin is empty) to `writer`.
///
/// # Panics
///
/// Panics (§7 `ProgrammerError`) if `values` is unsorted or outside
/// `[min, max]` -- these are all violations of the build contract in §4.1,
/// not runtime conditions a caller should expect to recover from.
pub fn build(writer: &mut ByteWriter, values: &[f32], min: f32, max: f32, num_bins: usize) {
    assert!(num_bins > 0, "k-vector requires at least one bin");
    assert!(max > min, "k-vector requires max > min");
    if !values.is_empty() {
        assert!(min <= values[0], "min must not exceed the smallest value");
        assert!(*values.last().unwrap() <= max, "max must not be below the largest value");
        for pair in values.windows(2) {
            assert!(pair[0] <= pair[1], "values must be sorted ascending");
        }
    }

    let bin_width = (max - min) / num_bins as f32;
    let mut bins = vec![0i32; num_bins + 1];

    let mut last_bin: i64 = 0;
    for (i, &v) in values.iter().enumerate() {
        let this_bin = ((v - min) / bin_width).ceil() as i64;
        assert!((0..=num_bins as i64).contains(&this_bin), "value maps outside [0, numBins]");
        for b in last_bin..this_bin {
            bins[b as usize] = i as i32;
        }
        last_bin = this_bin;
    }
    for b in last_bin..=(num_bins as i64) {
        bins[b as usize] = values.len() as i32;
    }

    writer.write_i32(values.len() as i32);
    writer.write_f32(min);
    writer.write_f32(max);
    writer.write_i32(num_bins as i32);
    for &b in &bins {
        writer.write_i32(b);
    }
}

/// A deserialized, read-only view over a k-vector index.
///
/// Borrows from the underlying database buffer rather than copying the bin
/// array (§5): the buffer must outlive this view.
#[derive(Debug, Clone, Copy)]
pub struct KVectorIndex<'a> {
    num_values: i64,
    min: f32,
    max: f32,
    bin_width: f32,
    num_bins: i64,
    bins: &'a [u8],
    endian: Endianness,
}

impl<'a> KVectorIndex<'a> {
    /// Parse a k-vector index starting at the reader's current position.
    /// Leaves the reader positioned just past the bin array.
    pub fn read(reader: &mut ByteReader<'a>) -> Result<Self> {
        let num_values = reader.read_i32()?;
        let min = reader.read_f32()?;
        let max = reader.read_f32()?;
        let num_bins = reader.read_i32()?;

        if num_values < 0 {
            return Err(LostError::DatabaseCorrupt(format!("negative numValues {}", num_values)));
        }
        if num_bins <= 0 {
            return Err(LostError::DatabaseCorrupt(format!("non-positive numBins {}", num_bins)));
        }
        if min < 0.0 {
            return Err(LostError::DatabaseCorrupt(format!("negative min {}", min)));
        }
        if max <= min {
            return Err(LostError::DatabaseCorrupt(format!("max {} <= min {}", max, min)));
        }

        let endian = reader.endian();

        reader.align(4);
        let bins_len = 4 * (num_bins as usize + 1);
        let bins = reader.read_raw(bins_len)?;

        let mut last = i32::MIN;
        for i in 0..=num_bins {
            let v = read_bin_raw(bins, i as usize, endian);
            if v < last {
                return Err(LostError::DatabaseCorrupt("k-vector bins are not monotone".to_string()));
            }
            last = v;
        }
        if read_bin_raw(bins, 0, endian) != 0 {
            return Err(LostError::DatabaseCorrupt("k-vector bins[0] must be 0".to_string()));
        }
        if read_bin_raw(bins, num_bins as usize, endian) != num_values {
            return Err(LostError::DatabaseCorrupt(
                "k-vector bins[numBins] must equal numValues".to_string(),
            ));
        }

        Ok(KVectorIndex {
            num_values: num_values as i64,
            min,
            max,
            bin_width: (max - min) / num_bins as f32,
            num_bins: num_bins as i64,
            bins,
            endian,
        })
    }

    pub fn num_values(&self) -> i64 {
        self.num_values
    }

    pub fn num_bins(&self) -> i64 {
        self.num_bins
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    fn bin(&self, i: i64) -> i32 {
        read_bin_raw(self.bins, i as usize, self.endian)
    }

    /// `binFor(q) = ceil((q - min) / binWidth)`, always in `[0, numBins]`
    /// for `q` in `[min, max]`.
    fn bin_for(&self, q: f32) -> i64 {
        let b = ((q - self.min) / self.bin_width).ceil() as i64;
        b.clamp(0, self.num_bins)
    }

    /// Return `(startIndex, count)` such that the index range
    /// `[startIndex, startIndex + count)` covers every underlying value in
    /// `[q_min, q_max]`, and may cover up to one bin-width of extra entries
    /// on each side (§4.1).
    ///
    /// # Panics
    ///
    /// Panics (§7 `ProgrammerError`) if `q_max <= q_min`.
    pub fn query_liberal(&self, q_min: f32, q_max: f32) -> (usize, usize) {
        assert!(q_max > q_min, "query_liberal requires q_max > q_min");

        if q_min > self.max || q_max < self.min {
            return (0, 0);
        }

        // epsilon much smaller than bin_width, so that the clamp below can
        // never push q_min/q_max across a bin boundary in the "wrong"
        // direction. See the Open Questions discussion of this clamp.
        let eps = (self.bin_width * 1e-4).max(f32::MIN_POSITIVE);

        let q_min = q_min.max(self.min + eps);
        let q_max = q_max.min(self.max - eps);

        let lower_bin = self.bin_for(q_min);
        let upper_bin = self.bin_for(q_max);
        // The clamp above guarantees lower_bin >= 1, which is required for
        // the bins[lower_bin - 1] lookup below to be in range.
        debug_assert!(lower_bin >= 1);

        let start_index = self.bin(lower_bin - 1);
        if start_index as i64 >= self.num_values {
            return (0, 0);
        }
        let end_index = self.bin(upper_bin) - 1;
        if end_index < start_index {
            return (0, 0);
        }
        (start_index as usize, (end_index - start_index + 1) as usize)
    }
}

fn read_bin_raw(bins: &[u8], index: usize, endian: Endianness) -> i32 {
    use byteorder::{BigEndian, ByteOrder, LittleEndian};
    let offset = index * 4;
    let slice = &bins[offset..offset + 4];
    match endian {
        Endianness::Little => LittleEndian::read_i32(slice),
        Endianness::Big => BigEndian::read_i32(slice),
    }
}
