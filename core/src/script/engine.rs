use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use common::edge::Edge;
use common::property::{PropertyContainer, PropertyValue};
use common::vertex::Vertex;
use uuid::Uuid;

use crate::graph::{Direction, Graph};

use super::ast::{Source, Step, Traversal};
use super::parser::parse_script;
use super::value::{ScriptValue, ValueCursor};
use super::{Bindings, EvalError, ScriptEngine};

/// Parsed traversals are cached up to this many distinct scripts; beyond
/// it the cache is dropped wholesale rather than evicted piecemeal.
const PLAN_CACHE_LIMIT: usize = 256;

/// Default [`ScriptEngine`]: parses traversal scripts with the shared
/// grammar and interprets them against the bound graph.
///
/// One engine is created at process startup and shared by every request.
/// The only cross-request state is the script-to-plan cache; bindings are
/// a per-call argument, so concurrent evaluations stay isolated.
pub struct TraversalEngine {
    plans: RwLock<HashMap<String, Arc<Traversal>>>,
}

impl TraversalEngine {
    pub fn new() -> Self {
        Self {
            plans: RwLock::new(HashMap::new()),
        }
    }

    fn plan(&self, script: &str) -> Result<Arc<Traversal>, EvalError> {
        if let Some(plan) = {
            let plans = self.plans.read().expect("plan cache lock poisoned");
            plans.get(script).cloned()
        } {
            return Ok(plan);
        }

        let parsed =
            Arc::new(parse_script(script).map_err(|err| EvalError::Parse(err.to_string()))?);

        let mut plans = self.plans.write().expect("plan cache lock poisoned");
        if plans.len() >= PLAN_CACHE_LIMIT {
            plans.clear();
        }
        Ok(plans
            .entry(script.to_string())
            .or_insert(parsed)
            .clone())
    }
}

impl Default for TraversalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine for TraversalEngine {
    fn eval(&self, script: &str, bindings: &Bindings) -> Result<ScriptValue, EvalError> {
        let plan = self.plan(script)?;
        interpret(&plan, bindings)
    }
}

/// Intermediate traversal state while folding steps.
enum Flow {
    /// The bare graph binding, awaiting a graph-level step.
    Graph,
    /// A single element or scalar.
    One(ScriptValue),
    /// A finite collection (from a list literal).
    Eager(Vec<ScriptValue>),
    /// A traversal stream; surfaces as a lazy cursor.
    Stream(Vec<ScriptValue>),
    /// A mutation consumed the traversal; no value remains.
    Nothing,
}

fn interpret(traversal: &Traversal, bindings: &Bindings) -> Result<ScriptValue, EvalError> {
    let mut flow = match &traversal.source {
        Source::Graph => Flow::Graph,
        Source::Vertex => {
            let vertex = bindings
                .vertex()
                .ok_or_else(|| EvalError::Runtime("no vertex bound as 'v'".into()))?;
            Flow::One(ScriptValue::Vertex(vertex.clone()))
        }
        Source::Edge => {
            let edge = bindings
                .edge()
                .ok_or_else(|| EvalError::Runtime("no edge bound as 'e'".into()))?;
            Flow::One(ScriptValue::Edge(edge.clone()))
        }
        Source::Literal(PropertyValue::List(items)) => Flow::Eager(
            items
                .iter()
                .cloned()
                .map(ScriptValue::Scalar)
                .collect(),
        ),
        Source::Literal(value) => Flow::One(ScriptValue::Scalar(value.clone())),
    };

    for step in &traversal.steps {
        flow = apply_step(flow, step, bindings.graph())?;
    }

    Ok(match flow {
        // a bare `g` resolves to the graph's textual summary
        Flow::Graph => ScriptValue::Scalar(PropertyValue::String(graph_summary(bindings.graph()))),
        Flow::One(value) => value,
        Flow::Eager(members) => ScriptValue::Collection(members),
        Flow::Stream(members) => ScriptValue::Cursor(ValueCursor::from_values(members)),
        Flow::Nothing => ScriptValue::Unit,
    })
}

fn graph_summary(graph: &Graph) -> String {
    format!(
        "graph[vertices:{}, edges:{}]",
        graph.vertex_count(),
        graph.edge_count()
    )
}

fn apply_step(flow: Flow, step: &Step, graph: &Arc<Graph>) -> Result<Flow, EvalError> {
    match step {
        Step::Vertices => {
            require_graph(flow, "V")?;
            Ok(Flow::Stream(
                graph.vertices().into_iter().map(ScriptValue::Vertex).collect(),
            ))
        }
        Step::Edges => {
            require_graph(flow, "E")?;
            Ok(Flow::Stream(
                graph.edges().into_iter().map(ScriptValue::Edge).collect(),
            ))
        }
        Step::AddVertex(properties) => {
            require_graph(flow, "addVertex")?;
            let id = element_id_from_properties(properties)?;
            let vertex = graph.add_vertex(Vertex::new(id, properties.clone()));
            Ok(Flow::One(ScriptValue::Vertex(vertex)))
        }
        Step::AddEdge {
            source,
            label,
            target,
            properties,
        } => {
            require_graph(flow, "addEdge")?;
            let source = parse_element_id(source)?;
            let target = parse_element_id(target)?;
            let id = element_id_from_properties(properties)?;
            let edge = graph
                .add_edge(Edge::new(id, label.clone(), source, target, properties.clone()))
                .map_err(|err| EvalError::Runtime(err.to_string()))?;
            Ok(Flow::One(ScriptValue::Edge(edge)))
        }
        Step::Clear => {
            require_graph(flow, "clear")?;
            graph.clear();
            Ok(Flow::Nothing)
        }
        Step::Out(label) => adjacency(flow, graph, Direction::Out, label.as_deref(), "out"),
        Step::In(label) => adjacency(flow, graph, Direction::In, label.as_deref(), "in"),
        Step::Both(label) => adjacency(flow, graph, Direction::Both, label.as_deref(), "both"),
        Step::OutE(label) => incidence(flow, graph, Direction::Out, label.as_deref(), "outE"),
        Step::InE(label) => incidence(flow, graph, Direction::In, label.as_deref(), "inE"),
        Step::BothE(label) => incidence(flow, graph, Direction::Both, label.as_deref(), "bothE"),
        Step::OutV => endpoints(flow, graph, true),
        Step::InV => endpoints(flow, graph, false),
        Step::Has { key, value } => {
            let members = members(flow, "has")?;
            let mut kept = Vec::new();
            for member in members {
                if element_property(&member, key, "has")?.map_or(false, |found| found == *value) {
                    kept.push(member);
                }
            }
            Ok(Flow::Stream(kept))
        }
        Step::Values(key) => {
            let members = members(flow, "values")?;
            let mut values = Vec::new();
            for member in members {
                if let Some(value) = element_property(&member, key, "values")? {
                    values.push(ScriptValue::Scalar(value));
                }
            }
            Ok(Flow::Stream(values))
        }
        Step::Id => {
            let members = members(flow, "id")?;
            let mut ids = Vec::new();
            for member in members {
                let id = match &member {
                    ScriptValue::Vertex(vertex) => vertex.id().to_string(),
                    ScriptValue::Edge(edge) => edge.id().to_string(),
                    other => {
                        return Err(EvalError::Runtime(format!(
                            "id() applies to elements, not {other}"
                        )))
                    }
                };
                ids.push(ScriptValue::Scalar(PropertyValue::String(id)));
            }
            Ok(Flow::Stream(ids))
        }
        Step::Label => {
            let members = members(flow, "label")?;
            let mut labels = Vec::new();
            for member in members {
                match &member {
                    ScriptValue::Edge(edge) => labels.push(ScriptValue::Scalar(
                        PropertyValue::String(edge.label().to_string()),
                    )),
                    other => {
                        return Err(EvalError::Runtime(format!(
                            "label() applies to edges, not {other}"
                        )))
                    }
                }
            }
            Ok(Flow::Stream(labels))
        }
        Step::Limit(count) => {
            let mut members = members(flow, "limit")?;
            members.truncate(*count);
            Ok(Flow::Stream(members))
        }
        Step::Count => {
            let members = members(flow, "count")?;
            Ok(Flow::One(ScriptValue::Scalar(PropertyValue::Integer(
                members.len() as i64,
            ))))
        }
        Step::Remove => {
            let members = members(flow, "remove")?;
            for member in members {
                match member {
                    ScriptValue::Vertex(vertex) => {
                        graph.remove_vertex(vertex.id());
                    }
                    ScriptValue::Edge(edge) => {
                        graph.remove_edge(edge.id());
                    }
                    other => {
                        return Err(EvalError::Runtime(format!(
                            "remove() applies to elements, not {other}"
                        )))
                    }
                }
            }
            Ok(Flow::Nothing)
        }
    }
}

fn require_graph(flow: Flow, step: &str) -> Result<(), EvalError> {
    match flow {
        Flow::Graph => Ok(()),
        _ => Err(EvalError::Runtime(format!(
            "{step}() applies to the graph binding 'g'"
        ))),
    }
}

/// Flattens the current flow into its members for an element-wise step.
fn members(flow: Flow, step: &str) -> Result<Vec<ScriptValue>, EvalError> {
    match flow {
        Flow::One(value) => Ok(vec![value]),
        Flow::Eager(members) | Flow::Stream(members) => Ok(members),
        Flow::Graph => Err(EvalError::Runtime(format!(
            "{step}() cannot be applied to the graph binding; start with V() or E()"
        ))),
        Flow::Nothing => Err(EvalError::Runtime(format!(
            "{step}() cannot follow a step that produced no value"
        ))),
    }
}

fn adjacency(
    flow: Flow,
    graph: &Arc<Graph>,
    direction: Direction,
    label: Option<&str>,
    step: &str,
) -> Result<Flow, EvalError> {
    let members = members(flow, step)?;
    let mut neighbors = Vec::new();
    for member in members {
        match member {
            ScriptValue::Vertex(vertex) => neighbors.extend(
                graph
                    .neighbors(vertex.id(), direction, label)
                    .into_iter()
                    .map(ScriptValue::Vertex),
            ),
            other => {
                return Err(EvalError::Runtime(format!(
                    "{step}() applies to vertices, not {other}"
                )))
            }
        }
    }
    Ok(Flow::Stream(neighbors))
}

fn incidence(
    flow: Flow,
    graph: &Arc<Graph>,
    direction: Direction,
    label: Option<&str>,
    step: &str,
) -> Result<Flow, EvalError> {
    let members = members(flow, step)?;
    let mut edges = Vec::new();
    for member in members {
        match member {
            ScriptValue::Vertex(vertex) => edges.extend(
                graph
                    .incident_edges(vertex.id(), direction, label)
                    .into_iter()
                    .map(ScriptValue::Edge),
            ),
            other => {
                return Err(EvalError::Runtime(format!(
                    "{step}() applies to vertices, not {other}"
                )))
            }
        }
    }
    Ok(Flow::Stream(edges))
}

fn endpoints(flow: Flow, graph: &Arc<Graph>, source_end: bool) -> Result<Flow, EvalError> {
    let step = if source_end { "outV" } else { "inV" };
    let members = members(flow, step)?;
    let mut vertices = Vec::new();
    for member in members {
        match member {
            ScriptValue::Edge(edge) => {
                let id = if source_end { edge.source() } else { edge.target() };
                // dangling endpoints are skipped rather than surfaced
                if let Some(vertex) = graph.vertex(id) {
                    vertices.push(ScriptValue::Vertex(vertex));
                }
            }
            other => {
                return Err(EvalError::Runtime(format!(
                    "{step}() applies to edges, not {other}"
                )))
            }
        }
    }
    Ok(Flow::Stream(vertices))
}

fn element_property(
    member: &ScriptValue,
    key: &str,
    step: &str,
) -> Result<Option<PropertyValue>, EvalError> {
    match member {
        ScriptValue::Vertex(vertex) => Ok(vertex.property(key).cloned()),
        ScriptValue::Edge(edge) => Ok(edge.property(key).cloned()),
        other => Err(EvalError::Runtime(format!(
            "{step}() applies to elements, not {other}"
        ))),
    }
}

/// Resolves an element id from a property map: an explicit `id` entry wins,
/// otherwise a fresh random id is assigned.
fn element_id_from_properties(
    properties: &HashMap<String, PropertyValue>,
) -> Result<Uuid, EvalError> {
    match properties.get("id") {
        Some(value) => parse_element_id(value),
        None => Ok(Uuid::new_v4()),
    }
}

fn parse_element_id(value: &PropertyValue) -> Result<Uuid, EvalError> {
    match value {
        PropertyValue::Integer(id) if *id >= 0 => Ok(Uuid::from_u128(*id as u128)),
        PropertyValue::String(raw) => {
            if let Ok(id) = Uuid::parse_str(raw) {
                Ok(id)
            } else {
                let parsed = raw
                    .parse::<u128>()
                    .map_err(|_| EvalError::Runtime(format!("invalid element id '{raw}'")))?;
                Ok(Uuid::from_u128(parsed))
            }
        }
        other => Err(EvalError::Runtime(format!(
            "unsupported element id {other}"
        ))),
    }
}
