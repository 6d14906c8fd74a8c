//! Text normalization for place-name comparison.
//!
//! Applied symmetrically to user input and to dataset names/aliases so that
//! "Niterói", "NITEROI" and "niteroi," all compare equal.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization as _;
use unicode_normalization::char::is_combining_mark;

/// Anything that is not a letter, a digit or whitespace.
static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s]+").expect("valid regex"));

/// Normalizes free text for comparison.
///
/// The pipeline:
/// 1. Lowercase
/// 2. Canonical decomposition (NFD) with combining marks dropped
/// 3. Strip every character that is not a letter, digit or whitespace
/// 4. Trim
///
/// Internal whitespace is left as-is. The function is idempotent.
#[must_use]
pub fn normalize(input: &str) -> String {
    let folded: String = input
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    NON_WORD_RE.replace_all(&folded, "").trim().to_string()
}
