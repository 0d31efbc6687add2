/// Upper-cases the first character and leaves the rest untouched
///
/// Used for category and unit names.
pub fn capitalize_first(value: &str) -> String {
    let value = value.trim();
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// First character upper-case, the rest lower-case (product names)
pub fn capitalize(value: &str) -> String {
    let value = value.trim();
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Trimmed and upper-cased (product codes, unit acronyms)
pub fn upper_code(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Trims an optional free-text field and drops it when blank
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize_first() {
        assert_eq!(capitalize_first("cereals"), "Cereals");
        assert_eq!(capitalize_first("  soft drinks "), "Soft drinks");
        assert_eq!(capitalize_first("uHT milk"), "UHT milk");
        assert_eq!(capitalize_first(""), "");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("MAIZE FLOUR"), "Maize flour");
        assert_eq!(capitalize("sugar"), "Sugar");
        assert_eq!(capitalize("   "), "");
    }

    #[test]
    fn test_upper_code() {
        assert_eq!(upper_code(" mf-001 "), "MF-001");
        assert_eq!(upper_code("kg"), "KG");
    }

    #[test]
    fn test_clean_optional() {
        assert_eq!(clean_optional(Some("  ".into())), None);
        assert_eq!(clean_optional(Some(" note ".into())), Some("note".into()));
        assert_eq!(clean_optional(None), None);
    }
}
