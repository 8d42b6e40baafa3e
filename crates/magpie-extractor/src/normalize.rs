//! Linked-data-style envelope normalization

use magpie_domain::Attributes;
use serde_json::Value;

/// Canonical vocabulary tag stamped on every envelope
pub const VOCABULARY: &str = "schema.org";

/// Envelope keys that are set by normalization and never copied through
const RESERVED_KEYS: [&str; 3] = ["type", "vocabulary", "id"];

/// Known attribute names mapped to their canonical spelling. Unknown names
/// pass through unchanged.
const FIELD_MAPPING: [(&str, &str); 17] = [
    ("name", "name"),
    ("description", "description"),
    ("price", "price"),
    ("priceCurrency", "priceCurrency"),
    ("brand", "brand"),
    ("image", "image"),
    ("url", "url"),
    ("aggregateRating", "aggregateRating"),
    ("reviewCount", "reviewCount"),
    ("availability", "availability"),
    ("annualFee", "annualFee"),
    ("interestRate", "interestRate"),
    ("rewards", "rewards"),
    ("benefits", "benefits"),
    ("coverage", "coverage"),
    ("policyTerm", "policyTerm"),
    ("serviceType", "serviceType"),
];

/// Wrap extracted attributes in an interchange envelope.
///
/// The envelope always carries `vocabulary`, `type` (from the attributes,
/// defaulting to "Product") and `id` (the source url). Remaining keys are
/// copied through the field-mapping table; null values are dropped.
pub fn normalize(attributes: &Attributes, url: &str) -> Attributes {
    let record_type = attributes
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or("Product");

    let mut envelope = Attributes::new();
    envelope.insert("vocabulary".to_string(), Value::String(VOCABULARY.into()));
    envelope.insert("type".to_string(), Value::String(record_type.into()));
    envelope.insert("id".to_string(), Value::String(url.into()));

    for (key, value) in attributes {
        if RESERVED_KEYS.contains(&key.as_str()) || value.is_null() {
            continue;
        }
        let canonical = FIELD_MAPPING
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, canonical)| *canonical)
            .unwrap_or(key.as_str());
        envelope.insert(canonical.to_string(), value.clone());
    }

    envelope
}
