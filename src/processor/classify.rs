use crate::models::{AccountCategory, ProductLine};

/// Keyword buckets for product lines. First match wins; "pale" is checked
/// before "lager" so "Pale Lager"-style descriptions land in Pale Ale the
/// same way every source classified them historically.
pub fn product_line(description: &str) -> ProductLine {
    let text = description.to_lowercase();
    if text.contains("pale") {
        ProductLine::PaleAle
    } else if text.contains("pilsner") {
        ProductLine::Pilsner
    } else if text.contains("ipa") {
        ProductLine::Ipa
    } else if text.contains("lager") {
        ProductLine::DarkLager
    } else {
        ProductLine::Other
    }
}

/// Classify an account from name keywords, for sources that carry no
/// customer-type code.
pub fn account_category_from_name(name: &str) -> AccountCategory {
    let name = name.to_lowercase();
    let contains_any = |keys: &[&str]| keys.iter().any(|k| name.contains(k));

    if contains_any(&["restaurant", "bar", "cafe"]) {
        AccountCategory::RestaurantBar
    } else if contains_any(&["grocery", "market", "grocer"]) {
        AccountCategory::Grocery
    } else if contains_any(&["liquor", "store", "shop"]) {
        AccountCategory::RetailStore
    } else {
        AccountCategory::Other
    }
}

/// Customer-type codes used by the Ollie exports.
pub fn account_category_from_code(code: &str) -> AccountCategory {
    match code.trim().to_uppercase().as_str() {
        "LIC" => AccountCategory::RestaurantBar,
        "GRC" => AccountCategory::Grocery,
        "LRS" => AccountCategory::RetailStore,
        "RAS" => AccountCategory::RuralStore,
        "MOS" => AccountCategory::ManufacturerChannel,
        _ => AccountCategory::Other,
    }
}

const KNOWN_CHANNELS: [&str; 7] = [
    "web",
    "pos",
    "faire",
    "airgoods",
    "iphone",
    "stack",
    "shopify_draft_order",
];

/// Reduce the order API's free-form `source_name` to a controlled
/// vocabulary: recognized literals title-cased, numeric app identifiers
/// bucketed as "Third Party", anything else "Other".
pub fn simplify_channel(source_name: Option<&str>) -> String {
    let Some(raw) = source_name else {
        return "Unknown".to_string();
    };
    let name = raw.to_lowercase().trim().to_string();
    if KNOWN_CHANNELS.contains(&name.as_str()) {
        title_case(&name)
    } else if !name.is_empty() && name.chars().all(|c| c.is_ascii_digit()) {
        "Third Party".to_string()
    } else {
        "Other".to_string()
    }
}

/// Capitalize the first letter of every alphabetic run ("shopify_draft_order"
/// -> "Shopify_Draft_Order").
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

/// Canadian province codes as shipped in order shipping addresses. Unknown
/// codes pass through untouched.
pub fn province_full_name(code: &str) -> String {
    match code {
        "AB" => "Alberta",
        "BC" => "British Columbia",
        "MB" => "Manitoba",
        "NB" => "New Brunswick",
        "NL" => "Newfoundland and Labrador",
        "NS" => "Nova Scotia",
        "NT" => "Northwest Territories",
        "NU" => "Nunavut",
        "ON" => "Ontario",
        "PE" => "Prince Edward Island",
        "QC" => "Quebec",
        "SK" => "Saskatchewan",
        "YT" => "Yukon",
        other => other,
    }
    .to_string()
}
