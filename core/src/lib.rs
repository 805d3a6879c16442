pub mod graph;
pub mod script;

pub use graph::{Direction, Graph, GraphError, GraphResult};
pub use script::{Bindings, EvalError, ScriptEngine, ScriptValue, TraversalEngine, ValueCursor};

pub use common::edge::{Edge, EdgeId};
pub use common::property::{Element, ElementId, PropertyContainer, PropertyValue};
pub use common::vertex::{Vertex, VertexId};
