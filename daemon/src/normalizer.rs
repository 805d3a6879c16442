use common::property::PropertyValue;
use gremlin_core::ScriptValue;
use serde_json::Value;

use crate::serializer::{plain_value, serialize_element, ReturnKeys, SerializeError};

/// Classifies a raw evaluation result and produces the ordered sequence of
/// JSON values for the response, or `None` when the script produced no
/// value at all. "No results" is deliberately distinct from "zero
/// results": a mutating script returns nothing, a traversal may match
/// nothing.
///
/// Classification happens in priority order, first match wins: no value,
/// eager collection (encounter order), lazy cursor (pull order, consumed
/// exactly once), otherwise a single value. Normalizing an already
/// exhausted cursor yields an empty sequence; the stream is never
/// re-iterated.
pub fn normalize(
    raw: ScriptValue,
    keys: &ReturnKeys,
    show_types: bool,
) -> Result<Option<Vec<Value>>, SerializeError> {
    match raw {
        ScriptValue::Unit => Ok(None),
        ScriptValue::Collection(members) => {
            let mut results = Vec::with_capacity(members.len());
            for member in members {
                append_member(&mut results, member, keys, show_types)?;
            }
            Ok(Some(results))
        }
        ScriptValue::Cursor(cursor) => {
            let mut results = Vec::new();
            while let Some(member) = cursor.pull() {
                append_member(&mut results, member, keys, show_types)?;
            }
            Ok(Some(results))
        }
        single => {
            let mut results = Vec::with_capacity(1);
            append_member(&mut results, single, keys, show_types)?;
            Ok(Some(results))
        }
    }
}

/// Element-ness is checked before numeric/boolean-ness, which is checked
/// before stringification, so an element is never mistaken for a plain
/// value. A no-value marker inside a sequence is skipped rather than
/// terminating iteration.
fn append_member(
    results: &mut Vec<Value>,
    member: ScriptValue,
    keys: &ReturnKeys,
    show_types: bool,
) -> Result<(), SerializeError> {
    let rendered = match member {
        ScriptValue::Unit => return Ok(()),
        ScriptValue::Vertex(vertex) => serialize_element(vertex.as_ref(), keys, show_types)?,
        ScriptValue::Edge(edge) => serialize_element(edge.as_ref(), keys, show_types)?,
        ScriptValue::Scalar(
            value @ (PropertyValue::Integer(_) | PropertyValue::Float(_) | PropertyValue::Boolean(_)),
        ) => plain_value(&value)?,
        other => Value::String(other.to_string()),
    };
    results.push(rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::vertex::{Vertex, VertexId};
    use gremlin_core::ValueCursor;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn vertex(id: u128) -> Arc<Vertex> {
        let mut properties = HashMap::new();
        properties.insert("name".to_string(), PropertyValue::String("Ada".into()));
        Arc::new(Vertex::new(VertexId::from_u128(id), properties))
    }

    #[test]
    fn no_value_normalizes_to_absent() {
        let result = normalize(ScriptValue::Unit, &ReturnKeys::Wildcard, false).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn collection_members_keep_encounter_order() {
        let raw = ScriptValue::Collection(vec![
            ScriptValue::Scalar(PropertyValue::Integer(3)),
            ScriptValue::Scalar(PropertyValue::Integer(1)),
            ScriptValue::Scalar(PropertyValue::Integer(2)),
        ]);

        let results = normalize(raw, &ReturnKeys::Wildcard, false).unwrap().unwrap();

        assert_eq!(results, vec![Value::from(3i64), Value::from(1i64), Value::from(2i64)]);
    }

    #[test]
    fn cursor_members_keep_pull_order_and_drain_once() {
        let cursor = ValueCursor::from_values(vec![
            ScriptValue::Vertex(vertex(1)),
            ScriptValue::Vertex(vertex(2)),
        ]);
        let raw = ScriptValue::Cursor(cursor.clone());

        let results = normalize(raw, &ReturnKeys::Wildcard, false).unwrap().unwrap();
        assert_eq!(results.len(), 2);

        // the shared stream is exhausted: normalizing again yields an
        // empty sequence, never a replay
        let results = normalize(ScriptValue::Cursor(cursor), &ReturnKeys::Wildcard, false)
            .unwrap()
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn no_value_markers_mid_stream_are_skipped() {
        let cursor = ValueCursor::from_values(vec![
            ScriptValue::Scalar(PropertyValue::Integer(1)),
            ScriptValue::Unit,
            ScriptValue::Scalar(PropertyValue::Integer(2)),
        ]);

        let results = normalize(ScriptValue::Cursor(cursor), &ReturnKeys::Wildcard, false)
            .unwrap()
            .unwrap();

        assert_eq!(results, vec![Value::from(1i64), Value::from(2i64)]);
    }

    #[test]
    fn single_scalar_becomes_a_one_member_sequence() {
        let raw = ScriptValue::Scalar(PropertyValue::Boolean(true));

        let results = normalize(raw, &ReturnKeys::Wildcard, false).unwrap().unwrap();

        assert_eq!(results, vec![Value::Bool(true)]);
    }

    #[test]
    fn elements_are_serialized_not_stringified() {
        let raw = ScriptValue::Cursor(ValueCursor::from_values(vec![ScriptValue::Vertex(
            vertex(5),
        )]));

        let results = normalize(raw, &ReturnKeys::Wildcard, false).unwrap().unwrap();

        assert!(results[0].is_object());
        assert_eq!(results[0]["properties"]["name"], "Ada");
    }

    #[test]
    fn other_values_fall_back_to_their_textual_form() {
        let raw = ScriptValue::Collection(vec![
            ScriptValue::Scalar(PropertyValue::String("plain".into())),
            ScriptValue::Scalar(PropertyValue::List(vec![
                PropertyValue::Integer(1),
                PropertyValue::Integer(2),
            ])),
        ]);

        let results = normalize(raw, &ReturnKeys::Wildcard, false).unwrap().unwrap();

        assert_eq!(results[0], Value::String("plain".into()));
        assert_eq!(results[1], Value::String("[1, 2]".into()));
    }

    #[test]
    fn member_serialization_failure_fails_the_whole_sequence() {
        let mut properties = HashMap::new();
        properties.insert("bad".to_string(), PropertyValue::Float(f64::INFINITY));
        let broken = Arc::new(Vertex::new(VertexId::from_u128(8), properties));
        let raw = ScriptValue::Collection(vec![
            ScriptValue::Scalar(PropertyValue::Integer(1)),
            ScriptValue::Vertex(broken),
        ]);

        let err = normalize(raw, &ReturnKeys::Wildcard, false).unwrap_err();
        assert!(matches!(err, SerializeError::NonFiniteNumber(_)));
    }
}
