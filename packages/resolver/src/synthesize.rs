//! Deterministic placeholder sector identifiers.
//!
//! Used when no authoritative sector geometry is available. The identifier
//! is the municipality code followed by a 6-digit suffix derived from the
//! 4th to 6th decimal digits of the coordinate's absolute latitude and
//! longitude. The arithmetic is a format contract: changing it changes
//! every synthesized identifier downstream.

use sector_map_geography_models::Coordinate;

/// Width of the zero-padded suffix.
pub const SUFFIX_WIDTH: usize = 6;

const SCALE: f64 = 10_000.0;
const PART_MODULUS: u64 = 1000;
const SUFFIX_MODULUS: u64 = 1_000_000;

/// Builds a placeholder sector identifier for `coordinate` in the
/// municipality with code `area_code`.
#[must_use]
pub fn synthesize(coordinate: &Coordinate, area_code: &str) -> String {
    let lat_part = scaled(coordinate.latitude) % PART_MODULUS;
    let lng_part = scaled(coordinate.longitude) % PART_MODULUS;
    let suffix = (lat_part * PART_MODULUS + lng_part) % SUFFIX_MODULUS;

    format!("{area_code}{suffix:0width$}", width = SUFFIX_WIDTH)
}

/// `floor(|degrees| × 10000)`. Non-finite input saturates.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled(degrees: f64) -> u64 {
    (degrees.abs() * SCALE).floor() as u64
}
