//! Text catalog parser
//!
//! This is the "catalog-file parser" adapter named as out of scope in §1;
//! it is kept as a thin boundary implementation so the rest of the crate has
//! something to build catalogs from, but it carries none of the core
//! invariants -- narrowing, serialization and the pair-distance database are
//! the specified parts.
//!
//! Line format (§6): `ra|dec|name|flag|mag.decimal`, where `ra`/`dec` are
//! decimal degrees, `name` is an integer identifier, `flag` is a single
//! character (`' '` for normal), and the magnitude is written as a signed
//! integer part and an unsigned decimal part. Grounded on the line-oriented
//! `BufRead` parsing in the teacher's `catalogs::hipparcos::from_dat_file`.

use std::io::BufRead;

use super::{Catalog, CatalogStar};
use crate::errors::{LostError, Result};

/// Parse a catalog text file (already opened) into a [`Catalog`].
///
/// Catalog index is assigned in the order lines are read, per §3.
pub fn parse_catalog_text<R: BufRead>(reader: R) -> Result<Catalog> {
    let mut stars = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(LostError::Io)?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        stars.push(parse_line(trimmed, line_no + 1)?);
    }
    Ok(Catalog::new(stars))
}

fn parse_line(line: &str, line_no: usize) -> Result<CatalogStar> {
    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() != 5 {
        return Err(LostError::CatalogParse {
            line: line_no,
            reason: format!("expected 5 fields separated by '|', found {}", fields.len()),
        });
    }

    let parse_err = |reason: String| LostError::CatalogParse { line: line_no, reason };

    let ra_deg: f64 = fields[0]
        .parse()
        .map_err(|_| parse_err(format!("invalid ra '{}'", fields[0])))?;
    let dec_deg: f64 = fields[1]
        .parse()
        .map_err(|_| parse_err(format!("invalid dec '{}'", fields[1])))?;
    let name: i32 = fields[2]
        .parse()
        .map_err(|_| parse_err(format!("invalid name '{}'", fields[2])))?;
    let flag = fields[3];
    if flag.chars().count() != 1 {
        return Err(parse_err(format!("flag field must be exactly one character, got '{}'", flag)));
    }

    let magnitude = parse_magnitude(fields[4]).ok_or_else(|| parse_err(format!("invalid magnitude '{}'", fields[4])))?;

    let ra = ra_deg.to_radians();
    let dec = dec_deg.to_radians();
    Ok(CatalogStar::from_ra_dec(ra, dec, magnitude, name))
}

/// Parse a magnitude written as `[-]integer.decimal` into hundredths,
/// applying the sign of the integer part to the decimal part as well: `-1.8`
/// means `-(1 + 0.8) = -1.8`, not `-1 + 0.8 = -0.2`. This mirrors a real bug
/// class in fixed-column astronomical catalog formats, called out explicitly
/// in §6.
fn parse_magnitude(text: &str) -> Option<i32> {
    let negative = text.starts_with('-');
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };

    let int_value: i64 = if int_part.is_empty() { 0 } else { int_part.parse().ok()? };

    // Normalize the fractional digits to exactly 2 (hundredths).
    let frac_value: i64 = match frac_part.len() {
        0 => 0,
        1 => format!("{}0", frac_part).parse().ok()?,
        _ => frac_part[..2].parse().ok()?,
    };

    let magnitude = int_value * 100 + frac_value;
    Some(if negative { -magnitude } else { magnitude } as i32)
}
