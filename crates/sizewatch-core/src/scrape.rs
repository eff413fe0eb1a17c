use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

static NUMERIC_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)?$").expect("valid regex"));

/// Normalized outcome of one successful scrape.
///
/// Construction enforces the stored shape: sizes are deduplicated and sorted
/// (numeric labels by value, ahead of textual labels), and the price carries
/// at most two fractional digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawScrapeResult")]
pub struct ScrapeResult {
    price: Decimal,
    sizes: Vec<String>,
}

/// Wire shape; deserialized values are normalized through [`ScrapeResult::new`].
#[derive(Deserialize)]
struct RawScrapeResult {
    price: Decimal,
    sizes: Vec<String>,
}

impl From<RawScrapeResult> for ScrapeResult {
    fn from(raw: RawScrapeResult) -> Self {
        Self::new(raw.price, raw.sizes)
    }
}

impl ScrapeResult {
    #[must_use]
    pub fn new(price: Decimal, sizes: Vec<String>) -> Self {
        Self {
            price: price.round_dp(2),
            sizes: sort_sizes(sizes),
        }
    }

    #[must_use]
    pub fn price(&self) -> Decimal {
        self.price
    }

    #[must_use]
    pub fn sizes(&self) -> &[String] {
        &self.sizes
    }

    #[must_use]
    pub fn into_parts(self) -> (Decimal, Vec<String>) {
        (self.price, self.sizes)
    }
}

fn sort_sizes(mut sizes: Vec<String>) -> Vec<String> {
    sizes.sort();
    sizes.dedup();
    sizes.sort_by(|a, b| compare_size_labels(a, b));
    sizes
}

/// Plain decimal labels such as `9` or `10.5`; `nan`, `inf` and exponent
/// forms stay textual.
fn numeric_value(label: &str) -> Option<f64> {
    let label = label.trim();
    if !NUMERIC_LABEL.is_match(label) {
        return None;
    }
    label.parse().ok()
}

/// Orders numeric labels by value before any textual label; ties and textual
/// labels fall back to plain string order so the sort stays total.
fn compare_size_labels(a: &str, b: &str) -> Ordering {
    match (numeric_value(a), numeric_value(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
