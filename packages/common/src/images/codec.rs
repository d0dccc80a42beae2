//! The `images_text` column stores additional image references as a JSON
//! array serialized into TEXT. These helpers are the only place that format
//! is read or written.

/// Encode references for the `images_text` column. An empty list is stored as NULL.
pub fn serialize_images(images: &[String]) -> Option<String> {
    if images.is_empty() {
        return None;
    }
    serde_json::to_string(images).ok()
}

/// Decode the `images_text` column.
///
/// NULL, malformed JSON, and non-array values decode to an empty list;
/// non-string and blank entries are dropped.
pub fn parse_images(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        Ok(_) => Vec::new(),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed images_text");
            Vec::new()
        }
    }
}

/// Every image of a listing for display: main first, then additional, blanks removed.
pub fn all_images(main_image: &str, additional: &[String]) -> Vec<String> {
    std::iter::once(main_image)
        .chain(additional.iter().map(String::as_str))
        .filter(|img| !img.trim().is_empty())
        .map(str::to_owned)
        .collect()
}
