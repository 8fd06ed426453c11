//! Hashtag normalization.
//!
//! Tags are stored once per normalized text: lowercase, no whitespace, no
//! leading `#`.

/// Normalize a raw hashtag for storage and lookup.
///
/// `"#Spicy Chicken"`, `"spicy chicken"` and `"  SPICY   CHICKEN"` all map to
/// `"spicychicken"`.
pub fn normalize_tag(raw: &str) -> String {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    compact.trim_start_matches('#').to_string()
}

/// Normalize a batch of raw tags, dropping empties and duplicates while
/// keeping first-seen order.
pub fn normalize_tags<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in raw {
        let normalized = normalize_tag(tag.as_ref());
        if !normalized.is_empty() && !out.contains(&normalized) {
            out.push(normalized);
        }
    }
    out
}
