//! Category filtering and narrative cleaning.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::types::{NormalizedRecord, Record};

pub const STRICT_PRODUCTS: &[&str] = &[
    "Credit card",
    "Personal loan",
    "Buy Now, Pay Later (BNPL)",
    "Savings account",
    "Money transfers",
];

/// Added on top of [`STRICT_PRODUCTS`] in expanded mode.
pub const ADJACENT_PRODUCTS: &[&str] = &[
    "Checking or savings account",
    "Credit card or prepaid card",
    "Credit reporting",
    "Credit reporting, credit repair services, or other personal consumer reports",
    "Money transfer, virtual currency, or money service",
];

static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(i am writing to file a complaint|i would like to report)\b").expect("static regex")
});
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9\s.,!?']").expect("static regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Strict,
    Expanded,
    All,
}

impl FilterMode {
    pub fn allows(&self, category: &str) -> bool {
        match self {
            Self::All => true,
            Self::Strict => STRICT_PRODUCTS.contains(&category),
            Self::Expanded => STRICT_PRODUCTS.contains(&category) || ADJACENT_PRODUCTS.contains(&category),
        }
    }
}

impl FromStr for FilterMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "strict" => Ok(Self::Strict),
            "expanded" => Ok(Self::Expanded),
            "all" => Ok(Self::All),
            other => Err(Error::Configuration(format!("Unknown filter mode: {other} (expected strict|expanded|all)"))),
        }
    }
}

/// Lowercase, strip boilerplate lead-ins and non-allow-listed characters, collapse whitespace.
///
/// Removing a phrase can splice its neighbours into a new match, so the phrase
/// pass runs until nothing changes; this keeps `clean_text` idempotent.
pub fn clean_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = DISALLOWED.replace_all(&lowered, "");
    let mut current = collapse(&stripped);
    loop {
        let next = collapse(&BOILERPLATE.replace_all(&current, ""));
        if next == current { return current; }
        current = next;
    }
}

fn collapse(s: &str) -> String { WHITESPACE.replace_all(s, " ").trim().to_string() }

/// Why a record did not make it through normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Category,
    EmptyNarrative,
    TooShort,
}

/// Per-row outcome counts of a normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub read: usize,
    pub kept: usize,
    pub off_category: usize,
    pub empty_narrative: usize,
    pub too_short: usize,
    pub schema_errors: usize,
}

impl NormalizeStats {
    pub fn dropped(&self) -> usize { self.off_category + self.empty_narrative + self.too_short + self.schema_errors }

    pub fn reject(&mut self, r: Rejection) {
        match r {
            Rejection::Category => self.off_category += 1,
            Rejection::EmptyNarrative => self.empty_narrative += 1,
            Rejection::TooShort => self.too_short += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextNormalizer {
    mode: FilterMode,
    min_words: Option<usize>,
}

impl TextNormalizer {
    pub fn new(mode: FilterMode, min_words: Option<usize>) -> Self { Self { mode, min_words } }

    pub fn mode(&self) -> FilterMode { self.mode }

    pub fn normalize_one(&self, record: Record) -> std::result::Result<NormalizedRecord, Rejection> {
        if !self.mode.allows(&record.category) { return Err(Rejection::Category); }
        let Some(narrative) = record.narrative.as_deref().filter(|n| !n.trim().is_empty()) else {
            return Err(Rejection::EmptyNarrative);
        };
        let cleaned = clean_text(narrative);
        if cleaned.is_empty() { return Err(Rejection::EmptyNarrative); }
        if let Some(min) = self.min_words {
            if cleaned.split_whitespace().count() < min { return Err(Rejection::TooShort); }
        }
        Ok(NormalizedRecord { record, cleaned_narrative: cleaned })
    }

    /// Take one parsed row through filtering and cleaning, counting the outcome.
    ///
    /// Record-local failures are logged and counted; `Ok(None)` means the row
    /// was dropped. Any other error is returned unchanged.
    pub fn admit(&self, row: Result<Record>, stats: &mut NormalizeStats) -> Result<Option<NormalizedRecord>> {
        stats.read += 1;
        let record = match row {
            Ok(r) => r,
            Err(e) if e.is_record_local() => {
                tracing::warn!(error = %e, "skipping record");
                stats.schema_errors += 1;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        match self.normalize_one(record) {
            Ok(n) => {
                stats.kept += 1;
                Ok(Some(n))
            }
            Err(r) => {
                stats.reject(r);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_boilerplate_and_symbols() {
        let raw = "I am writing to file a complaint:   My XXXX card was charged $35 (twice)!\n\nWhy?";
        assert_eq!(clean_text(raw), "my xxxx card was charged 35 twice! why?");
    }

    #[test]
    fn boilerplate_requires_word_boundaries() {
        assert_eq!(clean_text("I would like to reporting"), "i would like to reporting");
        assert_eq!(clean_text("I would like to report fraud"), "fraud");
    }

    #[test]
    fn spliced_boilerplate_is_removed() {
        let nested = "i would like to i would like to report report the fee";
        let once = clean_text(nested);
        assert_eq!(once, "the fee");
        assert_eq!(clean_text(&once), once);
    }

    #[test]
    fn unknown_mode_is_configuration_error() {
        assert!(matches!("everything".parse::<FilterMode>(), Err(Error::Configuration(_))));
        assert_eq!("expanded".parse::<FilterMode>().ok(), Some(FilterMode::Expanded));
    }

    #[test]
    fn expanded_is_superset_of_strict() {
        for p in STRICT_PRODUCTS {
            assert!(FilterMode::Expanded.allows(p));
        }
        assert!(FilterMode::Expanded.allows("Credit reporting"));
        assert!(!FilterMode::Strict.allows("Credit reporting"));
        assert!(FilterMode::All.allows("Mortgage"));
    }
}
