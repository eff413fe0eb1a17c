use std::str::FromStr;

use rust_decimal::Decimal;

use super::*;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[test]
fn clean_price_plain_and_symbol() {
    assert_eq!(clean_price("45.00").unwrap(), dec("45.00"));
    assert_eq!(clean_price("£45.00").unwrap(), dec("45.00"));
    assert_eq!(clean_price(" $19.99 ").unwrap(), dec("19.99"));
    assert_eq!(clean_price("€ 7").unwrap(), dec("7"));
}

#[test]
fn clean_price_strips_currency_codes() {
    assert_eq!(clean_price("120 GBP").unwrap(), dec("120"));
    assert_eq!(clean_price("usd 35.5").unwrap(), dec("35.5"));
    assert_eq!(clean_price("EUR89.95").unwrap(), dec("89.95"));
}

#[test]
fn clean_price_thousands_comma() {
    assert_eq!(clean_price("1,000.00").unwrap(), dec("1000.00"));
    assert_eq!(clean_price("£1,299.99").unwrap(), dec("1299.99"));
    assert_eq!(clean_price("1,299").unwrap(), dec("1299"));
}

#[test]
fn clean_price_decimal_comma() {
    assert_eq!(clean_price("1.000,00").unwrap(), dec("1000.00"));
    assert_eq!(clean_price("1.299,99 €").unwrap(), dec("1299.99"));
    assert_eq!(clean_price("1.000.000,50").unwrap(), dec("1000000.50"));
    assert_eq!(clean_price("1.000,").unwrap(), dec("1000"));
}

#[test]
fn clean_price_rounds_to_two_places() {
    assert_eq!(clean_price("10.005").unwrap().scale(), 2);
    assert_eq!(clean_price("99.999").unwrap(), dec("100.00"));
}

#[test]
fn clean_price_is_idempotent() {
    for raw in ["£1,299.99", "1.000,00", "45", "EUR 12.5", "0.10"] {
        let once = clean_price(raw).unwrap();
        let twice = clean_price(&once.to_string()).unwrap();
        assert_eq!(once, twice, "not idempotent for {raw}");
    }
}

#[test]
fn clean_price_rejects_garbage() {
    let err = clean_price("Sold out").unwrap_err();
    assert_eq!(err.raw, "Sold out");
    assert!(clean_price("").is_err());
    assert!(clean_price("£").is_err());
    assert!(clean_price("12,a4").is_err());
}

#[test]
fn clean_sizes_drops_placeholders_and_strips_noise() {
    assert_eq!(
        clean_sizes(&["Select", "Size (UK) 8", "UK 8 - In stock", ""]),
        vec!["8".to_owned()]
    );
}

#[test]
fn clean_sizes_preserves_order_and_duplicates() {
    assert_eq!(
        clean_sizes(&["10 - Low stock", "8", "9.5 out of stock", "8"]),
        vec!["10".to_owned(), "8".to_owned(), "9.5".to_owned(), "8".to_owned()]
    );
}

#[test]
fn clean_sizes_is_case_insensitive() {
    assert_eq!(
        clean_sizes(&["SELECT A SIZE", "size 7", "LOW STOCK 6"]),
        vec!["7".to_owned(), "6".to_owned()]
    );
}

#[test]
fn clean_sizes_keeps_text_labels() {
    assert_eq!(
        clean_sizes(&["  XL  ", "One  Size"]),
        vec!["XL".to_owned(), "One".to_owned()]
    );
}

#[test]
fn custom_rules_replace_defaults() {
    let rules = SizeRules::new(&["sold"], &["eu"]);
    assert_eq!(
        rules.clean(&["EU 42", "EU 43 sold", "Size 44"]),
        vec!["42".to_owned(), "Size 44".to_owned()]
    );
}

#[test]
fn finalize_dedups_and_sorts() {
    let result = finalize("£89.99", &["9", "UK 8 - Low stock", "8", "10"]).unwrap();
    assert_eq!(result.price(), dec("89.99"));
    assert_eq!(result.sizes(), ["8", "9", "10"]);
}

#[test]
fn finalize_fails_on_bad_price_without_partial_result() {
    let err = finalize("call for price", &["8"]).unwrap_err();
    assert_eq!(err.raw, "call for price");
}
