use std::collections::HashSet;

use common::property::{Element, PropertyValue};
use serde_json::{json, Map, Number, Value};
use thiserror::Error;

/// A return-keys entry of `*` selects every property, like omitting the
/// parameter altogether.
pub const WILDCARD: &str = "*";

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("property value {0} cannot be represented in JSON")]
    NonFiniteNumber(f64),
}

/// Which property keys of an element are serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnKeys {
    Wildcard,
    Keys(HashSet<String>),
}

impl ReturnKeys {
    /// Builds the projection from the request parameter: absent means
    /// wildcard, and an explicit `*` entry also means wildcard.
    pub fn from_request(keys: Option<&[String]>) -> Self {
        match keys {
            None => ReturnKeys::Wildcard,
            Some(keys) if keys.iter().any(|key| key == WILDCARD) => ReturnKeys::Wildcard,
            Some(keys) => ReturnKeys::Keys(keys.iter().cloned().collect()),
        }
    }

    pub fn includes(&self, key: &str) -> bool {
        match self {
            ReturnKeys::Wildcard => true,
            ReturnKeys::Keys(keys) => keys.contains(key),
        }
    }
}

/// Serializes one graph element: its identifier plus the projected subset
/// of its properties. Keys absent from the projection are silently
/// omitted; keys listed but missing on the element are not an error.
pub fn serialize_element(
    element: &dyn Element,
    keys: &ReturnKeys,
    show_types: bool,
) -> Result<Value, SerializeError> {
    let mut properties = Map::new();
    for (name, value) in element.properties() {
        if !keys.includes(name) {
            continue;
        }
        let rendered = if show_types {
            typed_value(value)?
        } else {
            plain_value(value)?
        };
        properties.insert(name.clone(), rendered);
    }

    Ok(json!({
        "id": element.element_id().to_string(),
        "properties": Value::Object(properties),
    }))
}

/// Best-effort plain JSON rendering; numeric subtypes collapse into JSON
/// numbers and nested structures stay structural.
pub fn plain_value(value: &PropertyValue) -> Result<Value, SerializeError> {
    Ok(match value {
        PropertyValue::Null => Value::Null,
        PropertyValue::Boolean(value) => Value::Bool(*value),
        PropertyValue::Integer(value) => Value::Number((*value).into()),
        PropertyValue::Float(value) => Value::Number(json_number(*value)?),
        PropertyValue::String(value) => Value::String(value.clone()),
        PropertyValue::List(items) => Value::Array(
            items
                .iter()
                .map(plain_value)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        PropertyValue::Map(entries) => {
            let mut rendered = Map::new();
            for (key, entry) in entries {
                rendered.insert(key.clone(), plain_value(entry)?);
            }
            Value::Object(rendered)
        }
    })
}

/// Type-preserving rendering: every value, recursively, becomes a
/// `{type, value}` pair so a consumer can reconstruct the native type that
/// plain JSON would collapse.
fn typed_value(value: &PropertyValue) -> Result<Value, SerializeError> {
    let (tag, rendered) = match value {
        PropertyValue::Null => ("null", Value::Null),
        PropertyValue::Boolean(value) => ("boolean", Value::Bool(*value)),
        PropertyValue::Integer(value) => ("integer", Value::Number((*value).into())),
        PropertyValue::Float(value) => ("double", Value::Number(json_number(*value)?)),
        PropertyValue::String(value) => ("string", Value::String(value.clone())),
        PropertyValue::List(items) => (
            "list",
            Value::Array(
                items
                    .iter()
                    .map(typed_value)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        ),
        PropertyValue::Map(entries) => {
            let mut rendered = Map::new();
            for (key, entry) in entries {
                rendered.insert(key.clone(), typed_value(entry)?);
            }
            ("map", Value::Object(rendered))
        }
    };

    Ok(json!({ "type": tag, "value": rendered }))
}

fn json_number(value: f64) -> Result<Number, SerializeError> {
    Number::from_f64(value).ok_or(SerializeError::NonFiniteNumber(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::vertex::{Vertex, VertexId};
    use std::collections::HashMap;

    fn fixture_vertex() -> Vertex {
        let mut properties = HashMap::new();
        properties.insert("name".to_string(), PropertyValue::String("a".into()));
        properties.insert("age".to_string(), PropertyValue::Integer(30));
        Vertex::new(VertexId::from_u128(1), properties)
    }

    /// Reconstructs a native value from its `{type, value}` rendering.
    fn native_from_typed(rendered: &Value) -> PropertyValue {
        let tag = rendered["type"].as_str().expect("type tag");
        let value = &rendered["value"];
        match tag {
            "null" => PropertyValue::Null,
            "boolean" => PropertyValue::Boolean(value.as_bool().unwrap()),
            "integer" => PropertyValue::Integer(value.as_i64().unwrap()),
            "double" => PropertyValue::Float(value.as_f64().unwrap()),
            "string" => PropertyValue::String(value.as_str().unwrap().to_string()),
            "list" => PropertyValue::List(
                value
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(native_from_typed)
                    .collect(),
            ),
            "map" => PropertyValue::Map(
                value
                    .as_object()
                    .unwrap()
                    .iter()
                    .map(|(key, entry)| (key.clone(), native_from_typed(entry)))
                    .collect(),
            ),
            other => panic!("unexpected type tag {other}"),
        }
    }

    #[test]
    fn includes_the_element_id() {
        let vertex = fixture_vertex();

        let rendered = serialize_element(&vertex, &ReturnKeys::Wildcard, false).unwrap();

        assert_eq!(
            rendered["id"].as_str(),
            Some(VertexId::from_u128(1).to_string().as_str())
        );
    }

    #[test]
    fn projection_omits_unlisted_keys() {
        let vertex = fixture_vertex();
        let keys = ReturnKeys::from_request(Some(&["name".to_string()]));

        for show_types in [false, true] {
            let rendered = serialize_element(&vertex, &keys, show_types).unwrap();
            let properties = rendered["properties"].as_object().unwrap();
            assert!(properties.contains_key("name"));
            assert!(!properties.contains_key("age"));
        }
    }

    #[test]
    fn projection_ignores_keys_the_element_lacks() {
        let vertex = fixture_vertex();
        let keys = ReturnKeys::from_request(Some(&["name".to_string(), "missing".to_string()]));

        let rendered = serialize_element(&vertex, &keys, false).unwrap();
        let properties = rendered["properties"].as_object().unwrap();
        assert_eq!(properties.len(), 1);
    }

    #[test]
    fn wildcard_entry_selects_all_keys() {
        let keys = ReturnKeys::from_request(Some(&["*".to_string()]));
        assert_eq!(keys, ReturnKeys::Wildcard);
    }

    #[test]
    fn typed_rendering_round_trips_native_values() {
        let mut nested = HashMap::new();
        nested.insert("flag".to_string(), PropertyValue::Boolean(true));
        let mut properties = HashMap::new();
        properties.insert("count".to_string(), PropertyValue::Integer(5));
        properties.insert("ratio".to_string(), PropertyValue::Float(5.0));
        properties.insert("active".to_string(), PropertyValue::Boolean(true));
        properties.insert("label".to_string(), PropertyValue::String("true".into()));
        properties.insert(
            "tags".to_string(),
            PropertyValue::List(vec![
                PropertyValue::Integer(1),
                PropertyValue::String("x".into()),
            ]),
        );
        properties.insert("extra".to_string(), PropertyValue::Map(nested));
        let vertex = Vertex::new(VertexId::from_u128(9), properties.clone());

        let rendered = serialize_element(&vertex, &ReturnKeys::Wildcard, true).unwrap();
        let rendered_properties = rendered["properties"].as_object().unwrap();

        for (key, original) in &properties {
            let reconstructed = native_from_typed(&rendered_properties[key]);
            assert_eq!(&reconstructed, original, "property {key}");
        }

        // the native distinction survives: integer 5 is not double 5.0 and
        // boolean true is not string "true"
        assert_eq!(rendered_properties["count"]["type"], "integer");
        assert_eq!(rendered_properties["ratio"]["type"], "double");
        assert_eq!(rendered_properties["active"]["type"], "boolean");
        assert_eq!(rendered_properties["label"]["type"], "string");
    }

    #[test]
    fn plain_rendering_keeps_structure() {
        let mut properties = HashMap::new();
        properties.insert(
            "tags".to_string(),
            PropertyValue::List(vec![
                PropertyValue::Integer(1),
                PropertyValue::Boolean(false),
            ]),
        );
        let vertex = Vertex::new(VertexId::from_u128(2), properties);

        let rendered = serialize_element(&vertex, &ReturnKeys::Wildcard, false).unwrap();

        assert_eq!(
            rendered["properties"]["tags"],
            serde_json::json!([1, false])
        );
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        let mut properties = HashMap::new();
        properties.insert("bad".to_string(), PropertyValue::Float(f64::NAN));
        let vertex = Vertex::new(VertexId::from_u128(3), properties);

        let err = serialize_element(&vertex, &ReturnKeys::Wildcard, false).unwrap_err();
        assert!(matches!(err, SerializeError::NonFiniteNumber(_)));

        let err = serialize_element(&vertex, &ReturnKeys::Wildcard, true).unwrap_err();
        assert!(matches!(err, SerializeError::NonFiniteNumber(_)));
    }
}
