//! HTML and embedded-JSON extraction primitives shared by the retailer
//! parsers.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{CaseSensitivity, ElementRef, Html, Selector};
use serde::de::DeserializeOwned;

use crate::error::ScrapeError;
use crate::normalize;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid regex"));

/// Parses a selector literal. Only called from `LazyLock` statics.
pub(crate) fn css(selector: &str) -> Selector {
    Selector::parse(selector).expect("valid selector")
}

/// Raw price and size strings pulled from a page, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Listing {
    pub(crate) price: String,
    pub(crate) sizes: Vec<String>,
}

impl Listing {
    pub(crate) fn new(price: impl Into<String>, sizes: Vec<String>) -> Self {
        Self {
            price: price.into(),
            sizes,
        }
    }

    pub(crate) fn finish(self, url: &str) -> Result<sizewatch_core::ScrapeResult, ScrapeError> {
        normalize::finalize(&self.price, &self.sizes).map_err(|source| ScrapeError::Normalize {
            url: url.to_owned(),
            source,
        })
    }
}

/// Text content of an element with runs of whitespace collapsed.
pub(crate) fn text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn first_text(doc: &Html, selectors: &[&Selector]) -> Option<String> {
    selectors
        .iter()
        .filter_map(|sel| doc.select(sel).next())
        .map(text)
        .find(|t| !t.is_empty())
}

pub(crate) fn attr(doc: &Html, selector: &Selector, name: &str) -> Option<String> {
    doc.select(selector)
        .find_map(|el| el.value().attr(name))
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// `content` of the first `<meta>` whose `property`, `name` or `itemprop`
/// equals `key`.
pub(crate) fn meta_content(doc: &Html, key: &str) -> Option<String> {
    ["property", "name", "itemprop"].iter().find_map(|kind| {
        let selector = Selector::parse(&format!(r#"meta[{kind}="{key}"]"#)).ok()?;
        attr(doc, &selector, "content")
    })
}

pub(crate) fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().has_class(class, CaseSensitivity::AsciiCaseInsensitive)
}

/// First capture group of `re` in `haystack`.
pub(crate) fn capture<'h>(re: &Regex, haystack: &'h str) -> Option<&'h str> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// First decimal number in `s`, e.g. `"8.5"` from `"UK 8.5 (EU 42.5)"`.
pub(crate) fn first_number(s: &str) -> Option<&str> {
    NUMBER_RE.find(s).map(|m| m.as_str())
}

/// Parses a JavaScript object literal lifted from a `<script>` block.
/// Single quotes are rewritten to double quotes first.
pub(crate) fn js_object<T: DeserializeOwned>(raw: &str, context: &str) -> Result<T, ScrapeError> {
    let normalized = raw.replace('\'', "\"");
    json(&normalized, context)
}

pub(crate) fn json<T: DeserializeOwned>(raw: &str, context: &str) -> Result<T, ScrapeError> {
    serde_json::from_str(raw).map_err(|source| ScrapeError::Json {
        context: context.to_owned(),
        source,
    })
}

/// Parses the JSON value that immediately follows `marker` in `body`,
/// ignoring whatever comes after it (`;`, more script, markup).
pub(crate) fn json_after<T: DeserializeOwned>(
    url: &str,
    body: &str,
    marker: &str,
    field: &'static str,
) -> Result<T, ScrapeError> {
    let start = body
        .find(marker)
        .ok_or_else(|| ScrapeError::missing(url, field))?;
    let rest = body[start + marker.len()..].trim_start();
    match serde_json::Deserializer::from_str(rest).into_iter::<T>().next() {
        Some(Ok(value)) => Ok(value),
        Some(Err(source)) => Err(ScrapeError::Json {
            context: format!("{field} on {url}"),
            source,
        }),
        None => Err(ScrapeError::missing(url, field)),
    }
}

/// `scheme://host[:port]` of `url`.
pub(crate) fn origin(url: &str) -> Result<String, ScrapeError> {
    reqwest::Url::parse(url)
        .map(|u| u.origin().ascii_serialization())
        .map_err(|e| ScrapeError::extraction(url, "origin", e.to_string()))
}

/// Last path segment of `url` before any `.html` suffix, ignoring query and
/// fragment.
pub(crate) fn product_slug(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .next_back()?;
    let slug = last.split(".html").next().unwrap_or(last);
    (!slug.is_empty()).then(|| slug.to_owned())
}

/// A JSON scalar rendered as a string; prices arrive as both numbers and
/// strings depending on the site.
pub(crate) fn scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_content_checks_property_name_and_itemprop() {
        let doc = Html::parse_document(
            r#"<html><head>
                <meta property="og:price:amount" content="120.00">
                <meta itemprop="sku" content=" B37699 ">
                <meta name="description" content="">
            </head></html>"#,
        );
        assert_eq!(meta_content(&doc, "og:price:amount").as_deref(), Some("120.00"));
        assert_eq!(meta_content(&doc, "sku").as_deref(), Some("B37699"));
        assert_eq!(meta_content(&doc, "description"), None);
        assert_eq!(meta_content(&doc, "missing"), None);
    }

    #[test]
    fn first_text_falls_back_through_selectors() {
        static REG: LazyLock<Selector> = LazyLock::new(|| css("span.regPrice"));
        static SALE: LazyLock<Selector> = LazyLock::new(|| css("span.salePrice"));
        let doc = Html::parse_document(r#"<span class="salePrice"> $49.99 </span>"#);
        assert_eq!(first_text(&doc, &[&REG, &SALE]).as_deref(), Some("$49.99"));
    }

    #[test]
    fn js_object_accepts_single_quotes() {
        let value: serde_json::Value = js_object("{'a': {'b': 'c'}}", "test").unwrap();
        assert_eq!(value["a"]["b"], "c");
    }

    #[test]
    fn json_after_stops_at_end_of_value() {
        let body = r#"<script>Product.Config({"basePrice":"95","x":[1,2]}); init();</script>"#;
        let value: serde_json::Value =
            json_after("https://shop.test/p", body, "Product.Config(", "config").unwrap();
        assert_eq!(value["basePrice"], "95");

        let err = json_after::<serde_json::Value>("https://shop.test/p", body, "spConfig", "config")
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Extraction { field: "config", .. }));
    }

    #[test]
    fn first_number_skips_labels() {
        assert_eq!(first_number("UK 8.5 (EU 42.5)"), Some("8.5"));
        assert_eq!(first_number(" 10 "), Some("10"));
        assert_eq!(first_number("XL"), None);
    }

    #[test]
    fn product_slug_strips_html_suffix_and_query() {
        assert_eq!(
            product_slug("https://www.reebok.co.uk/club-c-85/AR0456.html?forceSelSize=1").as_deref(),
            Some("AR0456")
        );
        assert_eq!(
            product_slug("https://www.asos.com/nike/air-max/prd/9001234/").as_deref(),
            Some("9001234")
        );
    }

    #[test]
    fn origin_keeps_scheme_host_and_port() {
        assert_eq!(origin("http://127.0.0.1:4010/p/x?y=1").unwrap(), "http://127.0.0.1:4010");
        assert!(origin("not a url").is_err());
    }
}
