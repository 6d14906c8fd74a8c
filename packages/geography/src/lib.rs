#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reference dataset and pure geo-resolution algorithms.
//!
//! The reference dataset (municipalities, aliases, neighborhoods and the
//! state bounding box) is embedded at compile time as TOML and parsed once
//! at startup into an immutable [`reference::ReferenceDataset`]. Everything
//! else in this crate is a pure function over that dataset:
//!
//! - [`normalize`]: text canonicalization for comparisons
//! - [`distance`]: haversine great-circle distance
//! - [`matcher`]: fuzzy alias matching of free text to a municipality
//! - [`nearest`]: nearest municipality / containing neighborhood search

pub mod distance;
pub mod matcher;
pub mod nearest;
pub mod normalize;
pub mod reference;

use thiserror::Error;

/// Errors that can occur while loading the reference dataset.
#[derive(Debug, Error)]
pub enum GeoError {
    /// TOML parsing failed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The dataset parsed but violates an integrity rule.
    #[error("Invalid reference dataset '{name}': {message}")]
    Dataset {
        /// Dataset identifier.
        name: String,
        /// Description of what went wrong.
        message: String,
    },
}
