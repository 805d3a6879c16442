//! Shared property types and helpers for graph elements.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier carried by every graph element.
pub type ElementId = uuid::Uuid;

/// Encapsulates the set of supported property value types.
///
/// `Null` is included so callers can distinguish between “missing key” and
/// “explicit null” when the data model requires it. Values nest: a property
/// may itself carry a list or a map of further values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
    Map(HashMap<String, PropertyValue>),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => write!(f, "null"),
            PropertyValue::Boolean(value) => write!(f, "{value}"),
            PropertyValue::Integer(value) => write!(f, "{value}"),
            PropertyValue::Float(value) => write!(f, "{value}"),
            PropertyValue::String(value) => write!(f, "{value}"),
            PropertyValue::List(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            PropertyValue::Map(entries) => {
                // keys sorted so the textual form is stable
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();
                write!(f, "{{")?;
                for (index, key) in keys.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {}", entries[key.as_str()])?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Provides read-only access to an entity's properties.
pub trait PropertyContainer {
    /// Returns the backing property map keyed by property name.
    fn properties(&self) -> &HashMap<String, PropertyValue>;

    /// Fetches a single property by name if present.
    fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties().get(name)
    }
}

/// A graph element: anything carrying an identifier and a property bag.
///
/// The serializer depends only on this trait, so it stays decoupled from
/// any particular element representation.
pub trait Element: PropertyContainer {
    fn element_id(&self) -> ElementId;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestContainer {
        properties: HashMap<String, PropertyValue>,
    }

    impl PropertyContainer for TestContainer {
        fn properties(&self) -> &HashMap<String, PropertyValue> {
            &self.properties
        }
    }

    fn fixture_container() -> TestContainer {
        let mut properties = HashMap::new();
        properties.insert("name".to_string(), PropertyValue::String("Ada".into()));
        properties.insert("active".to_string(), PropertyValue::Boolean(true));

        TestContainer { properties }
    }

    #[test]
    fn property_returns_value_when_present() {
        let container = fixture_container();

        let value = container.property("name");

        match value {
            Some(PropertyValue::String(name)) => assert_eq!(name, "Ada"),
            other => panic!("unexpected property value: {:?}", other),
        }
    }

    #[test]
    fn property_returns_none_when_missing() {
        let container = fixture_container();

        assert!(container.property("missing").is_none());
    }

    #[test]
    fn display_renders_nested_values() {
        let mut entries = HashMap::new();
        entries.insert("a".to_string(), PropertyValue::Integer(1));
        entries.insert("b".to_string(), PropertyValue::Boolean(false));
        let value = PropertyValue::List(vec![
            PropertyValue::String("x".into()),
            PropertyValue::Map(entries),
        ]);

        assert_eq!(value.to_string(), "[x, {a: 1, b: false}]");
    }

    #[test]
    fn deserializes_untagged_json_values() {
        let value: PropertyValue = serde_json::from_str("5").unwrap();
        assert_eq!(value, PropertyValue::Integer(5));

        let value: PropertyValue = serde_json::from_str("5.0").unwrap();
        assert_eq!(value, PropertyValue::Float(5.0));

        let value: PropertyValue = serde_json::from_str("[true, \"a\"]").unwrap();
        assert_eq!(
            value,
            PropertyValue::List(vec![
                PropertyValue::Boolean(true),
                PropertyValue::String("a".into()),
            ])
        );
    }
}
