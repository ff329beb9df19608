use std::collections::BTreeMap;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// One academic contact as stored in a `.AcademicContacts.json` file.
///
/// Every field is optional: a key missing from the file stays `None` and is
/// not written back, while an explicit empty string is kept as `Some("")`.
/// Loading is lenient: a number or boolean under a known key reads as its JSON
/// text, and the original value is written back as long as the field is not
/// changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub organization: Option<String>,
    pub addressline: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    /// Keys this program does not know about, kept so a save does not drop them.
    pub extra: BTreeMap<String, Value>,
    /// Non-string values found under known keys when the record was read.
    pub verbatim: BTreeMap<Field, Value>,
}

/// The eight known contact fields, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Email,
    Organization,
    AddressLine,
    City,
    Postcode,
    State,
    Country,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Name,
        Field::Email,
        Field::Organization,
        Field::AddressLine,
        Field::City,
        Field::Postcode,
        Field::State,
        Field::Country,
    ];

    /// Fields that make up an affiliation, in export order.
    pub const AFFILIATION: [Field; 6] = [
        Field::Organization,
        Field::AddressLine,
        Field::City,
        Field::Postcode,
        Field::State,
        Field::Country,
    ];

    /// JSON key, also used as the `elsarticle` affiliation key.
    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Organization => "organization",
            Field::AddressLine => "addressline",
            Field::City => "city",
            Field::Postcode => "postcode",
            Field::State => "state",
            Field::Country => "country",
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| field.key() == key)
    }

    pub fn title(self) -> &'static str {
        match self {
            Field::Name => "NAME",
            Field::Email => "EMAIL",
            Field::Organization => "ORGANIZATION",
            Field::AddressLine => "ADDRESS",
            Field::City => "CITY",
            Field::Postcode => "POSTCODE",
            Field::State => "STATE",
            Field::Country => "COUNTRY",
        }
    }
}

impl Contact {
    pub fn get(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Organization => &self.organization,
            Field::AddressLine => &self.addressline,
            Field::City => &self.city,
            Field::Postcode => &self.postcode,
            Field::State => &self.state,
            Field::Country => &self.country,
        };
        value.as_deref()
    }

    pub fn set(&mut self, field: Field, value: Option<String>) {
        *self.slot(field) = value;
    }

    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Name => &mut self.name,
            Field::Email => &mut self.email,
            Field::Organization => &mut self.organization,
            Field::AddressLine => &mut self.addressline,
            Field::City => &mut self.city,
            Field::Postcode => &mut self.postcode,
            Field::State => &mut self.state,
            Field::Country => &mut self.country,
        }
    }

    /// Value of `field` if it is set and non-empty.
    pub fn present(&self, field: Field) -> Option<&str> {
        self.get(field).filter(|value| !value.is_empty())
    }

    /// Name shown in lists and error messages.
    pub fn display_name(&self) -> &str {
        self.present(Field::Name).unwrap_or("<unnamed>")
    }

    /// All field values joined by single spaces, in declaration order.
    pub fn haystack(&self) -> String {
        Field::ALL
            .iter()
            .filter_map(|field| self.get(*field))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Text a non-string JSON value reads as; `None` for null and containers.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

impl Serialize for Contact {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        for field in Field::ALL {
            let current = self.get(field);
            match self.verbatim.get(&field) {
                Some(original) if scalar_text(original).as_deref() == current => {
                    map.serialize_entry(field.key(), original)?;
                }
                _ => {
                    if let Some(value) = current {
                        map.serialize_entry(field.key(), value)?;
                    }
                }
            }
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Contact {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut contact = Contact::default();
        for (key, value) in raw {
            let Some(field) = Field::from_key(&key) else {
                contact.extra.insert(key, value);
                continue;
            };
            match value {
                Value::String(text) => contact.set(field, Some(text)),
                other => {
                    contact.set(field, scalar_text(&other));
                    contact.verbatim.insert(field, other);
                }
            }
        }
        Ok(contact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_stay_missing_on_serialize() {
        let contact: Contact = serde_json::from_str(r#"{"name":"Ana","city":""}"#).unwrap();
        assert_eq!(contact.name.as_deref(), Some("Ana"));
        assert_eq!(contact.city.as_deref(), Some(""));
        assert_eq!(contact.email, None);

        let back = serde_json::to_value(&contact).unwrap();
        assert_eq!(back, serde_json::json!({"name": "Ana", "city": ""}));
    }

    #[test]
    fn test_unknown_keys_are_preserved() {
        let contact: Contact =
            serde_json::from_str(r#"{"name":"Ana","orcid":"0000-0001"}"#).unwrap();
        assert_eq!(
            contact.extra.get("orcid"),
            Some(&Value::String("0000-0001".to_string()))
        );

        let back = serde_json::to_value(&contact).unwrap();
        assert_eq!(back["orcid"], "0000-0001");
    }

    #[test]
    fn test_present_only_skips_empty_values() {
        let mut contact = Contact::default();
        contact.set(Field::Email, Some(String::new()));
        assert_eq!(contact.present(Field::Email), None);
        assert_eq!(contact.display_name(), "<unnamed>");

        contact.set(Field::Name, Some(" ".to_string()));
        assert_eq!(contact.present(Field::Name), Some(" "));
        assert_eq!(contact.display_name(), " ");
    }

    #[test]
    fn test_non_string_values_load_as_text() {
        let contact: Contact = serde_json::from_str(
            r#"{"name":"Ana","postcode":12345,"state":true,"email":null,"city":[1]}"#,
        )
        .unwrap();
        assert_eq!(contact.get(Field::Postcode), Some("12345"));
        assert_eq!(contact.get(Field::State), Some("true"));
        assert_eq!(contact.get(Field::Email), None);
        assert_eq!(contact.get(Field::City), None);
        assert!(contact.haystack().contains("12345"));
    }

    #[test]
    fn test_non_string_values_survive_round_trip() {
        let raw = serde_json::json!({
            "name": "Ana",
            "email": null,
            "postcode": 12345,
            "city": ["Lima"],
        });
        let contact: Contact = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&contact).unwrap(), raw);
    }

    #[test]
    fn test_edited_non_string_value_is_written_as_text() {
        let mut contact: Contact =
            serde_json::from_str(r#"{"name":"Ana","postcode":12345}"#).unwrap();
        contact.set(Field::Name, Some("Ana Lima".to_string()));
        contact.set(Field::Postcode, Some("12345".to_string()));
        assert_eq!(serde_json::to_value(&contact).unwrap()["postcode"], 12345);

        contact.set(Field::Postcode, Some("54321".to_string()));
        assert_eq!(serde_json::to_value(&contact).unwrap()["postcode"], "54321");
    }

    #[test]
    fn test_haystack_joins_in_field_order() {
        let contact = Contact {
            name: Some("Ana Lima".into()),
            email: Some("ana@x.com".into()),
            country: Some("Peru".into()),
            ..Contact::default()
        };
        assert_eq!(contact.haystack(), "Ana Lima ana@x.com Peru");
    }

    #[test]
    fn test_field_keys_match_json_names() {
        let contact = Contact {
            addressline: Some("Av. 1".into()),
            ..Contact::default()
        };
        let value = serde_json::to_value(&contact).unwrap();
        assert_eq!(value[Field::AddressLine.key()], "Av. 1");
    }
}
