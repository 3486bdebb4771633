//! Trailing suggestion annotations in assistant text.
//!
//! The model is asked to end answers with `[Suggestions: "A", "B"]`. The
//! annotation is stripped from the visible text and returned as a list.

const MARKER: &str = "[suggestions:";

/// Split assistant text into visible text and trailing suggestions
///
/// Text without a trailing annotation is returned unchanged with `None`.
pub fn extract_suggestions(text: &str) -> (String, Option<Vec<String>>) {
    let trimmed = text.trim_end();
    if !trimmed.ends_with(']') {
        return (text.to_string(), None);
    }

    // ASCII lowercasing keeps byte offsets valid in `trimmed`
    let lower = trimmed.to_ascii_lowercase();
    let Some(start) = lower.rfind(MARKER) else {
        return (text.to_string(), None);
    };

    let inner = &trimmed[start + MARKER.len()..trimmed.len() - 1];
    let items = parse_items(inner);
    let visible = trimmed[..start].trim_end().to_string();

    if items.is_empty() {
        (visible, None)
    } else {
        (visible, Some(items))
    }
}

fn parse_items(inner: &str) -> Vec<String> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Vec::new();
    }

    if let Ok(items) = serde_json::from_str::<Vec<String>>(&format!("[{}]", inner)) {
        return items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    // Loose form: unquoted or smart-quoted items
    inner
        .split(',')
        .map(|item| {
            item.trim()
                .trim_matches(|c| matches!(c, '"' | '\'' | '\u{201c}' | '\u{201d}'))
                .trim()
                .to_string()
        })
        .filter(|s| !s.is_empty())
        .collect()
}
