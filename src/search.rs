use crate::contact::Contact;

/// Normalize a string for matching (case-insensitive).
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
}

pub fn normalize_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(normalize(trimmed))
    }
}

/// Substring match of an already normalized query against every field value.
pub fn matches(contact: &Contact, normalized: &str) -> bool {
    normalize(&contact.haystack()).contains(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str, org: &str) -> Contact {
        Contact {
            name: Some(name.to_string()),
            organization: Some(org.to_string()),
            ..Contact::default()
        }
    }

    #[test]
    fn test_normalize_query_blank_is_none() {
        assert_eq!(normalize_query(""), None);
        assert_eq!(normalize_query("   "), None);
        assert_eq!(normalize_query(" Lima "), Some("lima".to_string()));
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let c = contact("Ana Lima", "Univ X");
        assert!(matches(&c, "ana"));
        assert!(matches(&c, "univ x"));
        assert!(!matches(&c, "bob"));
    }

    #[test]
    fn test_matches_across_field_boundary() {
        let c = contact("Ana Lima", "Univ X");
        assert!(matches(&c, "lima univ"));
    }

    #[test]
    fn test_matches_non_ascii() {
        let c = contact("José Müller", "ÉCOLE");
        assert!(matches(&c, &normalize("müller")));
        assert!(matches(&c, &normalize("école")));
    }
}
