//! Compile-time embedded reference dataset.
//!
//! The dataset is a TOML artifact under `reference/`, embedded via
//! `include_str!` and parsed once into a [`ReferenceDataset`]. The result is
//! immutable; callers share it behind an `Arc` and pass it by reference into
//! the matcher and search functions.

use std::collections::BTreeMap;

use sector_map_geography_models::{AdministrativeArea, Region, RegionBounds, SubArea};
use serde::Deserialize;

use crate::GeoError;
use crate::normalize::normalize;

/// Identifier of the dataset shipped with the engine.
pub const EMBEDDED_DATASET_NAME: &str = "rio_de_janeiro";

const EMBEDDED_DATASET_TOML: &str = include_str!("../reference/rio_de_janeiro.toml");

/// Raw on-disk shape of the dataset artifact.
#[derive(Debug, Deserialize)]
struct DatasetFile {
    version: u32,
    region: Region,
    areas: Vec<AdministrativeArea>,
    #[serde(default)]
    sub_areas: Vec<SubArea>,
}

/// A normalized match candidate (canonical name or alias) for one area.
#[derive(Debug, Clone)]
pub struct AliasEntry {
    /// Index of the owning area in [`ReferenceDataset::areas`].
    pub area_index: usize,
    /// Normalized candidate text.
    pub text: String,
    /// Character count of [`Self::text`].
    pub len: usize,
    /// Whether this candidate is the area's canonical full name.
    pub is_canonical: bool,
}

/// The immutable reference dataset.
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    name: String,
    version: u32,
    region: Region,
    areas: Vec<AdministrativeArea>,
    sub_areas: Vec<SubArea>,
    /// area key -> indexes into `sub_areas`, in declaration order
    sub_areas_by_area: BTreeMap<String, Vec<usize>>,
    /// area key -> index into `areas`
    areas_by_key: BTreeMap<String, usize>,
    /// Canonical names and aliases, normalized, in declaration order.
    aliases: Vec<AliasEntry>,
}

impl ReferenceDataset {
    /// Parses and validates the dataset shipped with the engine.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the embedded artifact is malformed. Since it
    /// is a compile-time constant, this indicates a development error and
    /// is caught by the tests below.
    pub fn embedded() -> Result<Self, GeoError> {
        Self::from_toml_str(EMBEDDED_DATASET_NAME, EMBEDDED_DATASET_TOML)
    }

    /// Parses and validates a dataset from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Toml`] if the text is not valid TOML for the
    /// dataset schema, or [`GeoError::Dataset`] if it violates an integrity
    /// rule (no areas, duplicate names or codes, sub-areas referencing an
    /// unknown area, non-positive radii, centers outside the region).
    pub fn from_toml_str(name: &str, toml_str: &str) -> Result<Self, GeoError> {
        let file: DatasetFile = toml::de::from_str(toml_str)?;
        let invalid = |message: String| GeoError::Dataset {
            name: name.to_string(),
            message,
        };

        if file.areas.is_empty() {
            return Err(invalid("dataset has no areas".to_string()));
        }

        let mut areas = file.areas;
        let mut areas_by_key = BTreeMap::new();
        let mut codes = BTreeMap::new();

        for (index, area) in areas.iter_mut().enumerate() {
            area.key = normalize(&area.name);
            if area.key.is_empty() {
                return Err(invalid(format!("area #{index} has an empty name")));
            }
            if area.code.is_empty() || !area.code.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid(format!(
                    "area '{}' has a non-numeric code '{}'",
                    area.name, area.code
                )));
            }
            if !area.center.is_finite() {
                return Err(invalid(format!("area '{}' has a non-finite center", area.name)));
            }
            if areas_by_key.insert(area.key.clone(), index).is_some() {
                return Err(invalid(format!("duplicate area name '{}'", area.name)));
            }
            if let Some(other) = codes.insert(area.code.clone(), area.name.clone()) {
                return Err(invalid(format!(
                    "areas '{other}' and '{}' share code {}",
                    area.name, area.code
                )));
            }
        }

        let mut sub_areas_by_area: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (index, sub_area) in file.sub_areas.iter().enumerate() {
            let parent = normalize(&sub_area.area);
            if !areas_by_key.contains_key(&parent) {
                return Err(invalid(format!(
                    "sub-area '{}' references unknown area '{}'",
                    sub_area.name, sub_area.area
                )));
            }
            if !(sub_area.radius_km.is_finite() && sub_area.radius_km > 0.0) {
                return Err(invalid(format!(
                    "sub-area '{}' has invalid radius {}",
                    sub_area.name, sub_area.radius_km
                )));
            }
            if !file.region.bounds.contains(&sub_area.center) {
                return Err(invalid(format!(
                    "sub-area '{}' center lies outside the region",
                    sub_area.name
                )));
            }
            sub_areas_by_area.entry(parent).or_default().push(index);
        }

        let aliases = build_alias_index(&areas);

        log::debug!(
            "Loaded reference dataset '{name}' v{}: {} areas, {} sub-areas, {} match candidates",
            file.version,
            areas.len(),
            file.sub_areas.len(),
            aliases.len()
        );

        Ok(Self {
            name: name.to_string(),
            version: file.version,
            region: file.region,
            areas,
            sub_areas: file.sub_areas,
            sub_areas_by_area,
            areas_by_key,
            aliases,
        })
    }

    /// Dataset identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dataset format/content version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// The region this dataset covers.
    #[must_use]
    pub const fn region(&self) -> &Region {
        &self.region
    }

    /// Bounding box of the region.
    #[must_use]
    pub const fn bounds(&self) -> &RegionBounds {
        &self.region.bounds
    }

    /// All areas, in declaration order. Never empty.
    #[must_use]
    pub fn areas(&self) -> &[AdministrativeArea] {
        &self.areas
    }

    /// All match candidates (canonical names then aliases, per area).
    #[must_use]
    pub fn aliases(&self) -> &[AliasEntry] {
        &self.aliases
    }

    /// Looks up an area by name, comparing normalized forms.
    #[must_use]
    pub fn area_by_name(&self, name: &str) -> Option<&AdministrativeArea> {
        self.areas_by_key
            .get(&normalize(name))
            .map(|&index| &self.areas[index])
    }

    /// Sub-areas registered under the area with the given key, in
    /// declaration order.
    pub fn sub_areas_of<'a>(
        &'a self,
        area_key: &str,
    ) -> impl Iterator<Item = &'a SubArea> + use<'a> {
        self.sub_areas_by_area
            .get(area_key)
            .into_iter()
            .flatten()
            .map(|&index| &self.sub_areas[index])
    }
}

fn build_alias_index(areas: &[AdministrativeArea]) -> Vec<AliasEntry> {
    let mut entries = Vec::new();

    for (area_index, area) in areas.iter().enumerate() {
        let candidates =
            std::iter::once(area.name.as_str()).chain(area.aliases.iter().map(String::as_str));

        for candidate in candidates {
            let text = normalize(candidate);
            if text.is_empty() {
                log::warn!("Ignoring empty alias for area '{}'", area.name);
                continue;
            }
            entries.push(AliasEntry {
                area_index,
                len: text.chars().count(),
                is_canonical: text == area.key,
                text,
            });
        }
    }

    entries
}
