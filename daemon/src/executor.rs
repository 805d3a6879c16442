use std::sync::Arc;

use gremlin_core::script::{Bindings, EvalError, ScriptEngine};
use gremlin_core::{Edge, Graph, ScriptValue, Vertex};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::normalizer::normalize;
use crate::serializer::{ReturnKeys, SerializeError};

/// The graph context a single request is evaluated against. At most one of
/// the vertex/edge slots is populated; the caller owns it for the duration
/// of one request and it is only read to populate bindings.
pub struct ExecutionContext {
    graph: Arc<Graph>,
    vertex: Option<Arc<Vertex>>,
    edge: Option<Arc<Edge>>,
}

impl ExecutionContext {
    pub fn graph_scoped(graph: Arc<Graph>) -> Self {
        Self {
            graph,
            vertex: None,
            edge: None,
        }
    }

    pub fn vertex_scoped(graph: Arc<Graph>, vertex: Arc<Vertex>) -> Self {
        Self {
            graph,
            vertex: Some(vertex),
            edge: None,
        }
    }

    pub fn edge_scoped(graph: Arc<Graph>, edge: Arc<Edge>) -> Self {
        Self {
            graph,
            vertex: None,
            edge: Some(edge),
        }
    }

    fn bindings(&self) -> Bindings {
        match (&self.vertex, &self.edge) {
            (Some(vertex), _) => Bindings::vertex_scoped(self.graph.clone(), vertex.clone()),
            (None, Some(edge)) => Bindings::edge_scoped(self.graph.clone(), edge.clone()),
            (None, None) => Bindings::graph_scoped(self.graph.clone()),
        }
    }
}

/// Parameters accepted by every evaluation entry point.
#[derive(Debug, Default, Deserialize)]
pub struct ScriptRequest {
    #[serde(default)]
    pub script: Option<String>,
    #[serde(rename = "rexster.showTypes", default)]
    pub show_types: bool,
    #[serde(rename = "rexster.returnKeys", default)]
    pub return_keys: Option<Vec<String>>,
}

impl ScriptRequest {
    pub fn projection(&self) -> ReturnKeys {
        ReturnKeys::from_request(self.return_keys.as_deref())
    }
}

/// Failure taxonomy of the evaluation pipeline. Validation failures never
/// reach the engine; evaluation failures carry the engine's message;
/// serialization failures fail the whole response (no partial results).
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no script provided")]
    MissingScript,
    #[error("{0}")]
    Eval(#[from] EvalError),
    #[error("{0}")]
    Serialize(#[from] SerializeError),
}

/// Validates the script and evaluates it against the context's bindings.
pub fn evaluate(
    engine: &dyn ScriptEngine,
    context: &ExecutionContext,
    script: Option<&str>,
) -> Result<ScriptValue, QueryError> {
    let script = script.map(str::trim).unwrap_or_default();
    if script.is_empty() {
        return Err(QueryError::MissingScript);
    }

    let bindings = context.bindings();
    Ok(engine.eval(script, &bindings)?)
}

/// Runs the whole pipeline for one request: validate, evaluate, normalize.
/// `Ok(None)` means the evaluation produced no value; the envelope builder
/// omits the results field for that case.
pub fn execute(
    engine: &dyn ScriptEngine,
    context: &ExecutionContext,
    request: &ScriptRequest,
) -> Result<Option<Vec<Value>>, QueryError> {
    let raw = evaluate(engine, context, request.script.as_deref())?;
    let results = normalize(raw, &request.projection(), request.show_types)?;
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::property::PropertyValue;
    use common::vertex::VertexId;
    use gremlin_core::TraversalEngine;
    use serde_json::json;
    use std::collections::HashMap;

    fn seeded_graph() -> Arc<Graph> {
        let graph = Graph::new();
        let mut properties = HashMap::new();
        properties.insert("name".to_string(), PropertyValue::String("Ada".into()));
        properties.insert("age".to_string(), PropertyValue::Integer(36));
        graph.add_vertex(Vertex::new(VertexId::from_u128(1), properties));
        Arc::new(graph)
    }

    #[test]
    fn missing_script_fails_validation_without_side_effects() {
        let graph = seeded_graph();
        let engine = TraversalEngine::new();
        let context = ExecutionContext::graph_scoped(graph.clone());
        let request = ScriptRequest::default();

        let err = execute(&engine, &context, &request).unwrap_err();

        assert!(matches!(err, QueryError::MissingScript));
        assert_eq!(err.to_string(), "no script provided");
        assert_eq!(graph.vertex_count(), 1);
    }

    #[test]
    fn whitespace_only_script_fails_validation() {
        let graph = seeded_graph();
        let engine = TraversalEngine::new();
        let context = ExecutionContext::graph_scoped(graph);
        let request = ScriptRequest {
            script: Some("   \n\t".into()),
            ..ScriptRequest::default()
        };

        let err = execute(&engine, &context, &request).unwrap_err();
        assert!(matches!(err, QueryError::MissingScript));
    }

    #[test]
    fn scalar_result_becomes_a_one_member_sequence() {
        let graph = seeded_graph();
        let engine = TraversalEngine::new();
        let context = ExecutionContext::graph_scoped(graph);
        let request = ScriptRequest {
            script: Some("true".into()),
            ..ScriptRequest::default()
        };

        let results = execute(&engine, &context, &request).unwrap();

        assert_eq!(results, Some(vec![json!(true)]));
    }

    #[test]
    fn mutation_with_no_return_value_is_absent_and_observable() {
        let graph = seeded_graph();
        let engine = TraversalEngine::new();
        let context = ExecutionContext::graph_scoped(graph.clone());
        let request = ScriptRequest {
            script: Some("g.clear()".into()),
            ..ScriptRequest::default()
        };

        let results = execute(&engine, &context, &request).unwrap();

        assert!(results.is_none());
        assert_eq!(graph.vertex_count(), 0);
    }

    #[test]
    fn traversal_results_honor_projection_and_types() {
        let graph = seeded_graph();
        let engine = TraversalEngine::new();
        let context = ExecutionContext::graph_scoped(graph);
        let request = ScriptRequest {
            script: Some("g.V()".into()),
            show_types: true,
            return_keys: Some(vec!["name".to_string()]),
        };

        let results = execute(&engine, &context, &request).unwrap().unwrap();

        assert_eq!(results.len(), 1);
        let properties = results[0]["properties"].as_object().unwrap();
        assert_eq!(properties.len(), 1);
        assert_eq!(properties["name"], json!({ "type": "string", "value": "Ada" }));
    }

    #[test]
    fn vertex_scoped_context_binds_the_vertex() {
        let graph = seeded_graph();
        let vertex = graph.vertex(VertexId::from_u128(1)).unwrap();
        let engine = TraversalEngine::new();
        let context = ExecutionContext::vertex_scoped(graph, vertex);
        let request = ScriptRequest {
            script: Some("v.values(\"name\")".into()),
            ..ScriptRequest::default()
        };

        let results = execute(&engine, &context, &request).unwrap().unwrap();

        assert_eq!(results, vec![json!("Ada")]);
    }

    #[test]
    fn engine_failures_carry_the_underlying_message() {
        let graph = seeded_graph();
        let engine = TraversalEngine::new();
        let context = ExecutionContext::graph_scoped(graph);
        let request = ScriptRequest {
            script: Some("v.values(\"name\")".into()),
            ..ScriptRequest::default()
        };

        let err = execute(&engine, &context, &request).unwrap_err();

        assert!(matches!(err, QueryError::Eval(_)));
        assert!(err.to_string().contains("no vertex bound"));
    }

    #[test]
    fn request_parameters_deserialize_with_their_wire_names() {
        let request: ScriptRequest = serde_json::from_value(json!({
            "script": "g.V()",
            "rexster.showTypes": true,
            "rexster.returnKeys": ["name"],
        }))
        .unwrap();

        assert_eq!(request.script.as_deref(), Some("g.V()"));
        assert!(request.show_types);
        assert_eq!(request.projection(), ReturnKeys::from_request(Some(&["name".to_string()])));
    }
}
