//! Price and size cleanup shared by every retailer scraper.
//!
//! Retailer pages render prices as `"£1,299.99"`, `"120 GBP"` or
//! `"1.299,99 €"`, and size labels with stock annotations such as
//! `"UK 8 - Low stock"`. These functions reduce both to canonical values.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use sizewatch_core::ScrapeResult;

use crate::error::NormalizeError;

static CURRENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[$£€]|GBP|USD|EUR").expect("valid regex"));

/// `1.299,99`: dots group thousands and the comma is the decimal mark.
static DECIMAL_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)+,\d*$").expect("valid regex"));

static DEFAULT_RULES: LazyLock<SizeRules> = LazyLock::new(SizeRules::default);

/// Phrases that make a size label meaningless (`drop`) or that are noise to
/// be removed from an otherwise useful label (`noise`). Matching is
/// case-insensitive.
#[derive(Debug, Clone)]
pub struct SizeRules {
    drop: Vec<String>,
    noise: Vec<Regex>,
}

impl SizeRules {
    #[must_use]
    pub fn new<S: AsRef<str>>(drop: &[S], noise: &[S]) -> Self {
        Self {
            drop: drop.iter().map(|d| d.as_ref().to_lowercase()).collect(),
            noise: noise
                .iter()
                .filter(|n| !n.as_ref().is_empty())
                .filter_map(|n| Regex::new(&format!("(?i){}", regex::escape(n.as_ref()))).ok())
                .collect(),
        }
    }

    /// Cleans one label, or returns `None` when it should be discarded.
    #[must_use]
    pub fn clean_one(&self, raw: &str) -> Option<String> {
        let lower = raw.to_lowercase();
        if self.drop.iter().any(|d| lower.contains(d.as_str())) {
            return None;
        }
        let mut label = raw.to_owned();
        for re in &self.noise {
            label = re.replace_all(&label, "").into_owned();
        }
        let label = label.split_whitespace().collect::<Vec<_>>().join(" ");
        (!label.is_empty()).then_some(label)
    }

    #[must_use]
    pub fn clean<S: AsRef<str>>(&self, raw: &[S]) -> Vec<String> {
        raw.iter().filter_map(|s| self.clean_one(s.as_ref())).collect()
    }
}

impl Default for SizeRules {
    fn default() -> Self {
        Self::new(
            &["select", "size (uk)"],
            &[
                "low stock",
                "out of stock",
                "in stock",
                "size",
                "uk",
                "-",
            ],
        )
    }
}

/// Parses a scraped price string into a two-decimal amount.
///
/// Currency symbols and ISO codes are stripped. If the remainder does not
/// parse and contains a comma, the comma is treated either as a decimal mark
/// (`"1.299,99"`) or as a thousands separator (`"1,299.99"`).
///
/// # Errors
///
/// Returns [`NormalizeError`] when no decimal can be recovered.
pub fn clean_price(raw: &str) -> Result<Decimal, NormalizeError> {
    let fail = |reason: &str| NormalizeError {
        raw: raw.to_owned(),
        reason: reason.to_owned(),
    };

    let stripped = CURRENCY_RE.replace_all(raw, "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        return Err(fail("empty after removing currency"));
    }

    if let Ok(value) = Decimal::from_str(stripped) {
        return Ok(value.round_dp(2));
    }
    if !stripped.contains(',') {
        return Err(fail("not a decimal number"));
    }

    let rewritten = if DECIMAL_COMMA_RE.is_match(stripped) {
        stripped.replace('.', "").replace(',', ".")
    } else {
        stripped.replace(',', "")
    };
    let rewritten = rewritten.trim_end_matches('.');

    Decimal::from_str(rewritten)
        .map(|v| v.round_dp(2))
        .map_err(|_| fail("not a decimal number after removing separators"))
}

/// Cleans size labels with the default rules, preserving order.
#[must_use]
pub fn clean_sizes<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    DEFAULT_RULES.clean(raw)
}

/// Produces the final result for a scrape: price parsed, sizes cleaned,
/// deduplicated and ordered.
///
/// # Errors
///
/// Returns [`NormalizeError`] when the price cannot be parsed.
pub fn finalize<S: AsRef<str>>(
    raw_price: &str,
    raw_sizes: &[S],
) -> Result<ScrapeResult, NormalizeError> {
    finalize_with(raw_price, raw_sizes, &DEFAULT_RULES)
}

/// [`finalize`] with caller-supplied size rules.
///
/// # Errors
///
/// Returns [`NormalizeError`] when the price cannot be parsed.
pub fn finalize_with<S: AsRef<str>>(
    raw_price: &str,
    raw_sizes: &[S],
    rules: &SizeRules,
) -> Result<ScrapeResult, NormalizeError> {
    let price = clean_price(raw_price)?;
    Ok(ScrapeResult::new(price, rules.clean(raw_sizes)))
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
