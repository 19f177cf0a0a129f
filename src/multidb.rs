//! MultiDatabase: a table-of-contents of sub-databases keyed by magic number
//!
//! Grounded on `lost`'s `MultiDatabase`/`MultiDatabaseBuilder`
//! (`databases.hpp`/`.cpp`). Almost every real invocation of the pipeline
//! needs at least a catalog and a pair-distance database bundled together,
//! so this is the format that actually gets handed to the star-id
//! algorithms rather than a bare pair-distance payload.

use crate::errors::{LostError, Result};
use crate::serialize::{ByteReader, ByteWriter};

/// Number of `(magic, offset)` slots in the table of contents. A fixed
/// capacity keeps the header a known size so payloads can be located without
/// first parsing the whole TOC; unused slots carry `magic = 0`.
pub const MAX_SUBDATABASES: usize = 16;

fn toc_len() -> usize {
    8 * MAX_SUBDATABASES
}

/// Builds a [`MultiDatabase`] payload by appending sub-database buffers.
pub struct MultiDatabaseBuilder {
    entries: Vec<(u32, Vec<u8>)>,
}

impl MultiDatabaseBuilder {
    pub fn new() -> Self {
        MultiDatabaseBuilder { entries: Vec::new() }
    }

    /// Register a sub-database's already-serialized bytes under `magic`.
    ///
    /// # Panics
    ///
    /// Panics if `magic == 0` (reserved for "unused slot"), if `magic` is
    /// already registered, or if the table of contents is full.
    pub fn add_sub_database(&mut self, magic: u32, bytes: Vec<u8>) {
        assert_ne!(magic, 0, "magic 0 is reserved for unused TOC slots");
        assert!(
            !self.entries.iter().any(|(m, _)| *m == magic),
            "magic 0x{:08X} already registered",
            magic
        );
        assert!(self.entries.len() < MAX_SUBDATABASES, "multi-database table of contents is full");
        self.entries.push((magic, bytes));
    }

    /// Serialize the table of contents followed by the concatenated
    /// sub-database payloads, in registration order.
    pub fn finish(self, writer: &mut ByteWriter) {
        let mut offset: i32 = 0;
        let offsets: Vec<i32> = self
            .entries
            .iter()
            .map(|(_, bytes)| {
                let this = offset;
                offset += bytes.len() as i32;
                this
            })
            .collect();

        for (i, (magic, _)) in self.entries.iter().enumerate() {
            writer.write_i32(*magic as i32);
            writer.write_i32(offsets[i]);
        }
        for _ in self.entries.len()..MAX_SUBDATABASES {
            writer.write_i32(0);
            writer.write_i32(0);
        }
        for (_, bytes) in &self.entries {
            writer.write_bytes(bytes);
        }
    }
}

impl Default for MultiDatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A deserialized, read-only view over a MultiDatabase buffer.
pub struct MultiDatabase<'a> {
    buffer: &'a [u8],
    toc: Vec<(u32, i32)>,
}

impl<'a> MultiDatabase<'a> {
    /// Parse the table of contents out of `buffer`. Does not validate the
    /// sub-database payloads themselves; that happens lazily in
    /// [`Self::sub_database`].
    pub fn new(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < toc_len() {
            return Err(LostError::DatabaseCorrupt(format!(
                "buffer of {} bytes is too short for a {}-entry table of contents",
                buffer.len(),
                MAX_SUBDATABASES
            )));
        }
        let mut reader = ByteReader::new(&buffer[..toc_len()], crate::serialize::Endianness::Little);
        let mut toc = Vec::with_capacity(MAX_SUBDATABASES);
        for _ in 0..MAX_SUBDATABASES {
            let magic = reader.read_i32()? as u32;
            let offset = reader.read_i32()?;
            if magic != 0 && offset < 0 {
                return Err(LostError::DatabaseCorrupt(format!(
                    "sub-database 0x{:08X} has negative offset {}",
                    magic, offset
                )));
            }
            toc.push((magic, offset));
        }
        Ok(MultiDatabase { buffer, toc })
    }

    /// Bytes of the sub-database payload registered under `magic`, starting
    /// at its declared offset and extending to the next sub-database's
    /// offset (or the end of the buffer for the last one).
    pub fn sub_database(&self, magic: u32) -> Result<&'a [u8]> {
        let index = self
            .toc
            .iter()
            .position(|&(m, _)| m == magic)
            .ok_or(LostError::NoSubDatabase(magic))?;
        let start = toc_len() + self.toc[index].1 as usize;

        let mut next_offsets: Vec<i32> = self.toc.iter().filter(|&&(m, _)| m != 0).map(|&(_, o)| o).collect();
        next_offsets.sort_unstable();
        let end = next_offsets
            .into_iter()
            .find(|&o| o > self.toc[index].1)
            .map(|o| toc_len() + o as usize)
            .unwrap_or(self.buffer.len());

        self.buffer
            .get(start..end)
            .ok_or_else(|| LostError::DatabaseCorrupt(format!("sub-database 0x{:08X} offset out of range", magic)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::Endianness;

    #[test]
    fn round_trips_two_sub_databases() {
        let mut builder = MultiDatabaseBuilder::new();
        builder.add_sub_database(0x1111_1111, vec![1, 2, 3, 4]);
        builder.add_sub_database(0x2222_2222, vec![9, 9, 9, 9, 9, 9]);
        let mut writer = ByteWriter::new(Endianness::Little);
        builder.finish(&mut writer);
        let bytes = writer.finish();

        let multi = MultiDatabase::new(&bytes).unwrap();
        assert_eq!(multi.sub_database(0x1111_1111).unwrap(), &[1, 2, 3, 4]);
        assert_eq!(multi.sub_database(0x2222_2222).unwrap(), &[9, 9, 9, 9, 9, 9]);
    }

    #[test]
    fn missing_magic_is_no_sub_database() {
        let mut builder = MultiDatabaseBuilder::new();
        builder.add_sub_database(0xABCD, vec![0]);
        let mut writer = ByteWriter::new(Endianness::Little);
        builder.finish(&mut writer);
        let bytes = writer.finish();

        let multi = MultiDatabase::new(&bytes).unwrap();
        assert!(matches!(multi.sub_database(0xDEAD), Err(LostError::NoSubDatabase(0xDEAD))));
    }

    #[test]
    #[should_panic]
    fn rejects_magic_zero() {
        let mut builder = MultiDatabaseBuilder::new();
        builder.add_sub_database(0, vec![1]);
    }

    #[test]
    fn short_buffer_is_database_corrupt() {
        let bytes = vec![0u8; 4];
        assert!(MultiDatabase::new(&bytes).is_err());
    }
}
