//! Catalog binary payload (§6)
//!
//! Wire layout: `int16 numStars | int8 flags | [numStars x catalog_star]`,
//! where `flags` bit 0 is "includes magnitude" and bit 1 is "includes name",
//! and each `catalog_star` is `Vec3 (3 x float32) [| float32 magnitude] [|
//! int16 name]`, each field present only if its flag bit is set. On the wire
//! magnitude is a float (e.g. `5.23`); in memory it is hundredths ([`super::CatalogStar::magnitude`])
//! to keep narrowing and comparisons exact.

use super::{Catalog, CatalogStar};
use crate::errors::{LostError, Result};
use crate::geometry::Vec3;
use crate::serialize::{ByteReader, ByteWriter};

/// Magic number for the catalog sub-database, per §6.
pub const CATALOG_MAGIC: u32 = 0xF9A2_83BC;

const FLAG_MAGNITUDE: u8 = 0b01;
const FLAG_NAME: u8 = 0b10;

/// Serialize `catalog` into its wire payload. `include_magnitude` and
/// `include_name` independently control which optional fields are written.
pub fn serialize_catalog(writer: &mut ByteWriter, catalog: &Catalog, include_magnitude: bool, include_name: bool) {
    let num_stars = catalog.len();
    assert!(num_stars <= i16::MAX as usize, "catalog too large to serialize as i16 count");
    writer.write_i16(num_stars as i16);

    let mut flags = 0u8;
    if include_magnitude {
        flags |= FLAG_MAGNITUDE;
    }
    if include_name {
        flags |= FLAG_NAME;
    }
    writer.write_u8(flags);

    for star in catalog.iter() {
        writer.write_f32(star.spatial.x() as f32);
        writer.write_f32(star.spatial.y() as f32);
        writer.write_f32(star.spatial.z() as f32);
        if include_magnitude {
            writer.write_f32(star.magnitude_f64() as f32);
        }
        if include_name {
            writer.write_i16(star.name as i16);
        }
    }
}

/// Deserialize a catalog payload, returning the catalog and which optional
/// fields were present. Stars that lack a serialized magnitude or name get
/// `0` for that field.
pub fn deserialize_catalog(reader: &mut ByteReader<'_>) -> Result<(Catalog, bool, bool)> {
    let num_stars = reader.read_i16()?;
    if num_stars < 0 {
        return Err(LostError::DatabaseCorrupt(format!("negative star count {}", num_stars)));
    }
    let flags = reader.read_u8()?;
    let has_magnitude = flags & FLAG_MAGNITUDE != 0;
    let has_name = flags & FLAG_NAME != 0;

    let mut stars = Vec::with_capacity(num_stars as usize);
    for _ in 0..num_stars {
        let x = reader.read_f32()? as f64;
        let y = reader.read_f32()? as f64;
        let z = reader.read_f32()? as f64;
        let magnitude = if has_magnitude {
            (reader.read_f32()? as f64 * 100.0).round() as i32
        } else {
            0
        };
        let name = if has_name { reader.read_i16()? as i32 } else { 0 };
        stars.push(CatalogStar::new(Vec3::new(x, y, z).normalize(), magnitude, name));
    }

    Ok((Catalog::new(stars), has_magnitude, has_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::Endianness;

    fn sample_catalog() -> Catalog {
        vec![
            CatalogStar::from_ra_dec(0.0, 0.0, 523, 11),
            CatalogStar::from_ra_dec(1.2, -0.3, -158, 22),
            CatalogStar::from_ra_dec(2.0, 0.4, 900, 33),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn round_trips_with_all_fields() {
        let catalog = sample_catalog();
        let mut writer = ByteWriter::new(Endianness::Little);
        serialize_catalog(&mut writer, &catalog, true, true);
        let bytes = writer.finish();

        let mut reader = ByteReader::new(&bytes, Endianness::Little);
        let (read_back, has_mag, has_name) = deserialize_catalog(&mut reader).unwrap();
        assert!(has_mag);
        assert!(has_name);
        assert_eq!(read_back.len(), catalog.len());
        for i in 0..catalog.len() {
            assert_eq!(read_back[i].name, catalog[i].name);
            assert_eq!(read_back[i].magnitude, catalog[i].magnitude);
            assert!((read_back[i].spatial.x() - catalog[i].spatial.x()).abs() < 1e-6);
        }
    }

    #[test]
    fn round_trips_with_no_optional_fields() {
        let catalog = sample_catalog();
        let mut writer = ByteWriter::new(Endianness::Little);
        serialize_catalog(&mut writer, &catalog, false, false);
        let bytes = writer.finish();

        let mut reader = ByteReader::new(&bytes, Endianness::Little);
        let (read_back, has_mag, has_name) = deserialize_catalog(&mut reader).unwrap();
        assert!(!has_mag);
        assert!(!has_name);
        for star in read_back.iter() {
            assert_eq!(star.magnitude, 0);
            assert_eq!(star.name, 0);
        }
    }
}
