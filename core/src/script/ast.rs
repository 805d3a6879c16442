use std::collections::HashMap;

use common::property::PropertyValue;

/// Where a traversal starts: one of the fixed bindings or a literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Graph,
    Vertex,
    Edge,
    Literal(PropertyValue),
}

/// One step of a method chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Vertices,
    Edges,
    Out(Option<String>),
    In(Option<String>),
    Both(Option<String>),
    OutE(Option<String>),
    InE(Option<String>),
    BothE(Option<String>),
    OutV,
    InV,
    Has {
        key: String,
        value: PropertyValue,
    },
    Values(String),
    Id,
    Label,
    Limit(usize),
    Count,
    AddVertex(HashMap<String, PropertyValue>),
    AddEdge {
        source: PropertyValue,
        label: String,
        target: PropertyValue,
        properties: HashMap<String, PropertyValue>,
    },
    Remove,
    Clear,
}

/// A parsed script: a source and the chain of steps applied to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    pub source: Source,
    pub steps: Vec<Step>,
}
