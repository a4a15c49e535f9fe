//! Relationship label table
//!
//! The closed set of edge labels and their reciprocals. Inference reads this
//! table and nothing else; an unknown label is rejected at the boundary.

/// All accepted relationship labels
pub const KNOWN_LABELS: [&str; 9] = [
    "parent-of",
    "child-of",
    "caregiver-of",
    "cared-for-by",
    "guardian-of",
    "ward-of",
    "sibling-of",
    "spouse-of",
    "knows",
];

/// Whether the label is in the accepted set
pub fn is_known_label(label: &str) -> bool {
    KNOWN_LABELS.contains(&label)
}

/// The reciprocal label implied by an edge, if one is configured.
/// Returns None for labels with no implied reverse ("knows").
pub fn reciprocal_of(label: &str) -> Option<&'static str> {
    match label {
        "parent-of" => Some("child-of"),
        "child-of" => Some("parent-of"),
        "caregiver-of" => Some("cared-for-by"),
        "cared-for-by" => Some("caregiver-of"),
        "guardian-of" => Some("ward-of"),
        "ward-of" => Some("guardian-of"),
        // Symmetric labels imply themselves
        "sibling-of" => Some("sibling-of"),
        "spouse-of" => Some("spouse-of"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reciprocals_are_involutions() {
        for label in KNOWN_LABELS {
            if let Some(reciprocal) = reciprocal_of(label) {
                assert_eq!(
                    reciprocal_of(reciprocal),
                    Some(label),
                    "reciprocal of {} must point back",
                    label
                );
            }
        }
    }

    #[test]
    fn test_unknown_label_rejected() {
        assert!(!is_known_label("owns"));
        assert!(!is_known_label(""));
        assert!(is_known_label("caregiver-of"));
    }

    #[test]
    fn test_plain_knows_has_no_reciprocal() {
        assert!(is_known_label("knows"));
        assert_eq!(reciprocal_of("knows"), None);
    }
}
