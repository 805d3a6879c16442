//! The traversal-script surface: the engine seam, per-request bindings,
//! and the default engine implementation.

pub mod ast;
pub mod engine;
pub mod parser;
pub mod value;

use std::sync::Arc;

use common::edge::Edge;
use common::vertex::Vertex;
use thiserror::Error;

use crate::graph::Graph;

pub use engine::TraversalEngine;
pub use parser::{parse_script, ParseError};
pub use value::{ScriptValue, ValueCursor};

/// Fixed identifier the graph is bound under for every evaluation.
pub const GRAPH_BINDING: &str = "g";
/// Fixed identifier for the focused vertex, when one is bound.
pub const VERTEX_BINDING: &str = "v";
/// Fixed identifier for the focused edge, when one is bound.
pub const EDGE_BINDING: &str = "e";

/// Per-request evaluation environment.
///
/// The engine itself is shared process-wide; bindings are always passed
/// into a single `eval` call and never stored on the engine, so concurrent
/// requests cannot observe each other's context. At most one of the
/// vertex/edge slots is populated.
#[derive(Clone)]
pub struct Bindings {
    graph: Arc<Graph>,
    vertex: Option<Arc<Vertex>>,
    edge: Option<Arc<Edge>>,
}

impl Bindings {
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

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    pub fn vertex(&self) -> Option<&Arc<Vertex>> {
        self.vertex.as_ref()
    }

    pub fn edge(&self) -> Option<&Arc<Edge>> {
        self.edge.as_ref()
    }
}

/// Failure raised while compiling or executing a script.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    Runtime(String),
}

/// The evaluation capability the request pipeline depends on: execute a
/// script against a set of bindings and produce a raw result.
///
/// Implementations are long-lived, shared, process-wide values; any state
/// they keep across calls must be safe under concurrent evaluation.
pub trait ScriptEngine: Send + Sync {
    fn eval(&self, script: &str, bindings: &Bindings) -> Result<ScriptValue, EvalError>;
}
