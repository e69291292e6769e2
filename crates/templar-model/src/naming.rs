//! Identifier sanitizing shared by namespace derivation and code generation
//!
//! Casing is done by hand rather than with `heck`: its upper camel case
//! lowercases inner capitals, turning `HTMLTitle` into `HtmlTitle`.

/// Turn an arbitrary display string into a type-safe identifier
///
/// Words are split on any character that is not alphanumeric, each word gets
/// an uppercase first letter, and a leading digit is prefixed with `_`.
pub fn identifier(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    for word in name.split(|c: char| !c.is_alphanumeric()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }

    match result.chars().next() {
        None => "_".to_string(),
        Some(first) if first.is_ascii_digit() => format!("_{}", result),
        Some(_) => result,
    }
}

/// Sanitize every segment of a dotted namespace, dropping empty segments
pub fn namespace(segments: &[&str]) -> String {
    segments
        .iter()
        .flat_map(|segment| segment.split('.'))
        .filter(|segment| segment.chars().any(|c| c.is_alphanumeric()))
        .map(identifier)
        .collect::<Vec<_>>()
        .join(".")
}

/// Join namespace parts, skipping empty ones
pub fn join_namespace(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(".")
}
