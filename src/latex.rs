//! LaTeX front matter export for `elsarticle`-style journal templates.
//!
//! Each contact becomes an `\author` line followed by its `\ead`, and
//! contacts that share an affiliation reference the same `\affiliation`
//! block. The first contact is the corresponding author.

use std::collections::HashMap;

use thiserror::Error;

use crate::contact::{Contact, Field};

const CORRESPONDING_LABEL: &str = "cor1";

/// Fields every contact must carry to be exported.
const REQUIRED: [Field; 3] = [Field::Name, Field::Email, Field::Organization];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("contact \"{contact}\" has no {field}")]
    MissingField { contact: String, field: &'static str },
}

/// Escape LaTeX special characters in a single pass over `input`.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '#' => out.push_str("\\#"),
            '$' => out.push_str("\\$"),
            '%' => out.push_str("\\%"),
            '&' => out.push_str("\\&"),
            '_' => out.push_str("\\_"),
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            other => out.push(other),
        }
    }
    out
}

/// Check that every contact carries the required fields.
pub fn validate(contacts: &[Contact]) -> Result<(), ExportError> {
    for contact in contacts {
        for field in REQUIRED {
            if contact.present(field).is_none() {
                return Err(ExportError::MissingField {
                    contact: contact.display_name().to_string(),
                    field: field.key(),
                });
            }
        }
    }
    Ok(())
}

/// The escaped `key={value}` pairs of a contact's affiliation fields.
pub fn affiliation_key(contact: &Contact) -> String {
    Field::AFFILIATION
        .iter()
        .filter_map(|field| {
            contact
                .present(*field)
                .map(|value| format!("{}={{{}}}", field.key(), escape(value)))
        })
        .collect::<Vec<_>>()
        .join(",\n")
}

/// Render the author, email and affiliation lines for `contacts`.
///
/// Affiliation indices start at 1 and follow first appearance; contacts
/// whose affiliation keys are identical share an index.
pub fn export(contacts: &[Contact]) -> Result<String, ExportError> {
    let Some(first) = contacts.first() else {
        return Ok(String::new());
    };
    validate(contacts)?;

    let mut lines = vec![format!(
        "\\cortext[{}]{{Corresponding author: {}}}",
        CORRESPONDING_LABEL,
        escape(first.display_name())
    )];

    let mut indices: HashMap<String, usize> = HashMap::new();
    let mut affiliations: Vec<String> = Vec::new();

    for (position, contact) in contacts.iter().enumerate() {
        let key = affiliation_key(contact);
        let index = match indices.get(&key) {
            Some(index) => *index,
            None => {
                affiliations.push(key.clone());
                let index = affiliations.len();
                indices.insert(key, index);
                index
            }
        };

        let name = escape(contact.display_name());
        let email = escape(contact.present(Field::Email).unwrap_or_default());
        if position == 0 {
            lines.push(format!(
                "\\author[{}]{{{}\\corref{{{}}}}}",
                index, name, CORRESPONDING_LABEL
            ));
        } else {
            lines.push(format!("\\author[{}]{{{}}}", index, name));
        }
        lines.push(format!("\\ead{{{}}}", email));
    }

    for (idx, key) in affiliations.iter().enumerate() {
        lines.push(format!("\\affiliation[{}]{{{}}}", idx + 1, key));
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str, email: &str, org: &str, city: &str, country: &str) -> Contact {
        Contact {
            name: Some(name.into()),
            email: Some(email.into()),
            organization: Some(org.into()),
            addressline: Some(String::new()),
            city: Some(city.into()),
            postcode: Some(String::new()),
            state: Some(String::new()),
            country: Some(country.into()),
            ..Contact::default()
        }
    }

    #[test]
    fn test_escape_table() {
        assert_eq!(escape("A & B"), "A \\& B");
        assert_eq!(escape("50% of $5"), "50\\% of \\$5");
        assert_eq!(escape("a_b#c"), "a\\_b\\#c");
        assert_eq!(escape("{x}"), "\\{x\\}");
        assert_eq!(escape("~^"), "\\textasciitilde{}\\textasciicircum{}");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_escape_does_not_rescan_its_output() {
        // The braces emitted for a backslash must not be escaped again.
        assert_eq!(escape("\\"), "\\textbackslash{}");
        assert_eq!(escape("\\{"), "\\textbackslash{}\\{");
    }

    #[test]
    fn test_empty_list_exports_nothing() {
        assert_eq!(export(&[]), Ok(String::new()));
    }

    #[test]
    fn test_shared_affiliation_is_emitted_once() {
        let contacts = vec![
            contact("Ana Lima", "ana@x.com", "Univ X", "Lima", "Peru"),
            contact("Bob Cruz", "bob@x.com", "Univ X", "Lima", "Peru"),
        ];
        let out = export(&contacts).unwrap();
        let expected = [
            "\\cortext[cor1]{Corresponding author: Ana Lima}",
            "\\author[1]{Ana Lima\\corref{cor1}}",
            "\\ead{ana@x.com}",
            "\\author[1]{Bob Cruz}",
            "\\ead{bob@x.com}",
            "\\affiliation[1]{organization={Univ X},\ncity={Lima},\ncountry={Peru}}",
        ]
        .join("\n");
        assert_eq!(out, expected);
        assert_eq!(out.matches("\\affiliation[").count(), 1);
    }

    #[test]
    fn test_distinct_affiliations_get_first_seen_indices() {
        let contacts = vec![
            contact("Ana", "ana@x.com", "Univ X", "Lima", "Peru"),
            contact("Bob", "bob@y.com", "Univ Y", "Quito", "Ecuador"),
            contact("Cid", "cid@x.com", "Univ X", "Lima", "Peru"),
        ];
        let out = export(&contacts).unwrap();
        assert!(out.contains("\\author[1]{Ana\\corref{cor1}}"));
        assert!(out.contains("\\author[2]{Bob}"));
        assert!(out.contains("\\author[1]{Cid}"));
        let first = out.find("\\affiliation[1]").unwrap();
        let second = out.find("\\affiliation[2]").unwrap();
        assert!(first < second);
        assert!(out[second..].contains("organization={Univ Y}"));
    }

    #[test]
    fn test_dedup_compares_escaped_text_exactly() {
        let contacts = vec![
            contact("Ana", "ana@x.com", "Univ X", "Lima", "Peru"),
            contact("Bob", "bob@x.com", "Univ X", "lima", "Peru"),
        ];
        let out = export(&contacts).unwrap();
        assert_eq!(out.matches("\\affiliation[").count(), 2);
    }

    #[test]
    fn test_missing_email_fails_without_output() {
        let bob = contact("Bob Cruz", "", "Univ X", "Lima", "Peru");
        let contacts = vec![contact("Ana", "ana@x.com", "Univ X", "Lima", "Peru"), bob];
        assert_eq!(
            export(&contacts),
            Err(ExportError::MissingField {
                contact: "Bob Cruz".into(),
                field: "email",
            })
        );
    }

    #[test]
    fn test_missing_name_uses_placeholder() {
        let mut anon = contact("", "a@x.com", "Univ X", "Lima", "Peru");
        anon.name = None;
        let err = export(&[anon]).unwrap_err();
        assert_eq!(err.to_string(), "contact \"<unnamed>\" has no name");
    }

    #[test]
    fn test_names_and_affiliations_are_escaped() {
        let contacts = vec![contact("A & B", "a_b@x.com", "R&D Lab", "Lima", "Peru")];
        let out = export(&contacts).unwrap();
        assert!(out.contains("\\author[1]{A \\& B\\corref{cor1}}"));
        assert!(out.contains("\\ead{a\\_b@x.com}"));
        assert!(out.contains("organization={R\\&D Lab}"));
    }

    #[test]
    fn test_whitespace_values_count_as_present() {
        let contacts = vec![contact(" ", "a@x.com", "Univ X", " ", "")];
        let out = export(&contacts).unwrap();
        assert!(out.contains("\\author[1]{ \\corref{cor1}}"));
        assert!(out.contains("\\affiliation[1]{organization={Univ X},\ncity={ }}"));
    }

    #[test]
    fn test_numeric_values_are_exported_as_text() {
        let contacts: Vec<Contact> = serde_json::from_str(
            r#"[{"name":"Ana","email":"a@x.com","organization":"Univ X","postcode":15001}]"#,
        )
        .unwrap();
        let out = export(&contacts).unwrap();
        assert!(out.contains("organization={Univ X},\npostcode={15001}"));
    }

    #[test]
    fn test_export_is_deterministic() {
        let contacts = vec![
            contact("Ana", "ana@x.com", "Univ X", "Lima", "Peru"),
            contact("Bob", "bob@y.com", "Univ Y", "Quito", "Ecuador"),
            contact("Cid", "cid@z.com", "Univ Z", "Bogotá", "Colombia"),
        ];
        assert_eq!(export(&contacts), export(&contacts));
    }
}
