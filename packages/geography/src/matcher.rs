//! Fuzzy matching of free text against the known municipalities.
//!
//! This is a greedy substring-containment heuristic, not token matching:
//! every canonical name and alias contained in the normalized input is
//! scored, and the best score wins. Short aliases nested inside longer
//! place names ("rio" inside "cabo frio") can produce false positives, so
//! coordinate-based resolution should be preferred when precision matters.
//!
//! Scoring, per contained candidate:
//!
//! - base score `len(candidate) / len(input)`
//! - `× 1.5` when the candidate is longer than 5 characters
//! - `× 2` when the candidate is the area's canonical full name
//!
//! Ties keep the first candidate encountered in dataset order.

use sector_map_geography_models::AdministrativeArea;

use crate::normalize::normalize;
use crate::reference::{AliasEntry, ReferenceDataset};

/// Candidates longer than this many characters get the specificity bonus.
pub const SPECIFIC_ALIAS_MIN_LEN: usize = 5;

/// Multiplier for candidates longer than [`SPECIFIC_ALIAS_MIN_LEN`].
pub const SPECIFIC_ALIAS_MULTIPLIER: f64 = 1.5;

/// Multiplier for a candidate equal to the area's canonical name.
pub const CANONICAL_NAME_MULTIPLIER: f64 = 2.0;

/// The winning candidate of [`best_match`].
#[derive(Debug, Clone, Copy)]
pub struct AreaMatch<'a> {
    /// The matched area.
    pub area: &'a AdministrativeArea,
    /// The normalized candidate text that matched.
    pub alias: &'a str,
    /// The candidate's score.
    pub score: f64,
}

/// Returns the best-scoring area whose name or alias is contained in
/// `text`, or `None` if nothing matches.
#[must_use]
pub fn match_area<'a>(
    dataset: &'a ReferenceDataset,
    text: &str,
) -> Option<&'a AdministrativeArea> {
    best_match(dataset, text).map(|m| m.area)
}

/// Like [`match_area`], but also reports which candidate won and its score.
#[must_use]
pub fn best_match<'a>(dataset: &'a ReferenceDataset, text: &str) -> Option<AreaMatch<'a>> {
    let input = normalize(text);
    if input.is_empty() {
        return None;
    }
    let input_len = input.chars().count();

    let mut best: Option<AreaMatch<'a>> = None;

    for entry in dataset.aliases() {
        if !input.contains(entry.text.as_str()) {
            continue;
        }

        let score = score(entry, input_len);
        if best.is_none_or(|current| score > current.score) {
            best = Some(AreaMatch {
                area: &dataset.areas()[entry.area_index],
                alias: &entry.text,
                score,
            });
        }
    }

    if let Some(m) = &best {
        log::trace!(
            "Matched '{text}' to {} via '{}' (score {:.3})",
            m.area.name,
            m.alias,
            m.score
        );
    }

    best
}

#[allow(clippy::cast_precision_loss)]
fn score(entry: &AliasEntry, input_len: usize) -> f64 {
    let mut score = entry.len as f64 / input_len as f64;
    if entry.len > SPECIFIC_ALIAS_MIN_LEN {
        score *= SPECIFIC_ALIAS_MULTIPLIER;
    }
    if entry.is_canonical {
        score *= CANONICAL_NAME_MULTIPLIER;
    }
    score
}
