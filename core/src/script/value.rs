use std::fmt;
use std::sync::{Arc, Mutex};

use common::edge::Edge;
use common::property::PropertyValue;
use common::vertex::Vertex;

/// The raw, untyped result of evaluating a script.
///
/// Exactly one shape is produced per evaluation: no value at all, a single
/// scalar or element, an eager collection, or a lazy cursor. Members of a
/// collection or cursor are not re-classified as sequences themselves.
#[derive(Debug, Clone)]
pub enum ScriptValue {
    /// The script produced no value (for example `g.clear()`).
    Unit,
    Scalar(PropertyValue),
    Vertex(Arc<Vertex>),
    Edge(Arc<Edge>),
    Collection(Vec<ScriptValue>),
    Cursor(ValueCursor),
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Unit => write!(f, "null"),
            ScriptValue::Scalar(value) => write!(f, "{value}"),
            ScriptValue::Vertex(vertex) => write!(f, "v[{}]", vertex.id()),
            ScriptValue::Edge(edge) => write!(f, "e[{}]", edge.id()),
            ScriptValue::Collection(members) => {
                write!(f, "[")?;
                for (index, member) in members.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{member}")?;
                }
                write!(f, "]")
            }
            ScriptValue::Cursor(_) => write!(f, "[cursor]"),
        }
    }
}

/// A lazy, single-consumption stream of script values.
///
/// Handles are cheap clones over one shared iterator: pulling through any
/// handle advances the same underlying stream, so a drained cursor yields
/// nothing no matter which handle asks. A cursor is never replayed.
#[derive(Clone)]
pub struct ValueCursor {
    inner: Arc<Mutex<Box<dyn Iterator<Item = ScriptValue> + Send>>>,
}

impl ValueCursor {
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = ScriptValue> + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Box::new(iter))),
        }
    }

    pub fn from_values(values: Vec<ScriptValue>) -> Self {
        Self::new(values.into_iter())
    }

    /// Pulls the next value, advancing the shared stream.
    pub fn pull(&self) -> Option<ScriptValue> {
        let mut iter = self.inner.lock().expect("cursor lock poisoned");
        iter.next()
    }
}

impl fmt::Debug for ValueCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCursor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_handles_share_one_stream() {
        let cursor = ValueCursor::from_values(vec![
            ScriptValue::Scalar(PropertyValue::Integer(1)),
            ScriptValue::Scalar(PropertyValue::Integer(2)),
        ]);
        let other = cursor.clone();

        assert!(matches!(
            cursor.pull(),
            Some(ScriptValue::Scalar(PropertyValue::Integer(1)))
        ));
        assert!(matches!(
            other.pull(),
            Some(ScriptValue::Scalar(PropertyValue::Integer(2)))
        ));
        assert!(cursor.pull().is_none());
        assert!(other.pull().is_none());
    }

    #[test]
    fn display_renders_values() {
        assert_eq!(ScriptValue::Unit.to_string(), "null");
        assert_eq!(
            ScriptValue::Scalar(PropertyValue::String("abc".into())).to_string(),
            "abc"
        );
        assert_eq!(
            ScriptValue::Collection(vec![
                ScriptValue::Scalar(PropertyValue::Integer(1)),
                ScriptValue::Scalar(PropertyValue::Boolean(true)),
            ])
            .to_string(),
            "[1, true]"
        );
    }
}
