//! Address formatting and HTML escaping for hospital listings.

use std::collections::BTreeMap;

/// Placeholder shown when no address can be determined.
pub const ADDRESS_NOT_AVAILABLE: &str = "Address not available";

/// OSM address tags, in display order.
const ADDRESS_TAGS: [&str; 4] = ["addr:street", "addr:city", "addr:state", "addr:postcode"];

/// Build an address from OSM tags.
///
/// Joins the non-empty `addr:street`, `addr:city`, `addr:state` and
/// `addr:postcode` tags with `", "`. Falls back to a free-form `address` tag,
/// then to [`ADDRESS_NOT_AVAILABLE`].
#[must_use]
pub fn address_from_tags(tags: &BTreeMap<String, String>) -> String {
    let parts: Vec<&str> = ADDRESS_TAGS
        .iter()
        .filter_map(|key| tags.get(*key))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect();

    if !parts.is_empty() {
        return parts.join(", ");
    }

    tags.get("address")
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map_or_else(|| ADDRESS_NOT_AVAILABLE.to_string(), str::to_string)
}

/// Escape text for inclusion in HTML element content or quoted attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
