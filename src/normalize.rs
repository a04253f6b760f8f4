//! Canonical keys for free-text place names.
//!
//! Trip log entries are typed by users while feature store names are
//! curated, so the two only meet through [`normalize_name`]. The key is
//! case- and whitespace-insensitive and nothing more: punctuation,
//! abbreviations and diacritics still distinguish names.

/// Normalize a place name into its join key.
///
/// Lowercases, trims and collapses internal whitespace runs into single
/// spaces. `None` maps to the empty string. Idempotent.
///
/// # Example
///
/// ```rust
/// use trip_insights::normalize_name;
///
/// assert_eq!(normalize_name(Some("  Taj   Mahal ")), "taj mahal");
/// assert_eq!(normalize_name(None), "");
/// ```
pub fn normalize_name(name: Option<&str>) -> String {
    match name {
        Some(name) => name
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" "),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_whitespace_insensitive() {
        assert_eq!(normalize_name(Some("  Taj   Mahal ")), "taj mahal");
        assert_eq!(normalize_name(Some("taj mahal")), "taj mahal");
        assert_eq!(normalize_name(Some("TAJ\tMAHAL\n")), "taj mahal");
    }

    #[test]
    fn test_idempotent() {
        for raw in ["  Red   Fort ", "Sabarmati Ashram", "", "   ", "Kankaria\u{00A0}Lake"] {
            let once = normalize_name(Some(raw));
            assert_eq!(normalize_name(Some(&once)), once);
        }
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(normalize_name(None), "");
        assert_eq!(normalize_name(Some("")), "");
        assert_eq!(normalize_name(Some("   ")), "");
    }

    #[test]
    fn test_no_fuzzy_matching() {
        assert_ne!(normalize_name(Some("St. Xavier's")), normalize_name(Some("St Xaviers")));
        assert_ne!(normalize_name(Some("Café Mocha")), normalize_name(Some("Cafe Mocha")));
    }
}
