use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::property::{Element, ElementId, PropertyContainer, PropertyValue};
use crate::vertex::VertexId;

pub type EdgeId = ElementId;

/// Alias representing an edge label
pub type Label = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    id: EdgeId,
    label: Label,
    source: VertexId,
    target: VertexId,
    properties: HashMap<String, PropertyValue>,
}

impl Edge {
    pub fn new(
        id: EdgeId,
        label: Label,
        source: VertexId,
        target: VertexId,
        properties: HashMap<String, PropertyValue>,
    ) -> Self {
        Self {
            id,
            label,
            source,
            target,
            properties,
        }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> VertexId {
        self.source
    }

    pub fn target(&self) -> VertexId {
        self.target
    }
}

impl PropertyContainer for Edge {
    fn properties(&self) -> &HashMap<String, PropertyValue> {
        &self.properties
    }
}

impl Element for Edge {
    fn element_id(&self) -> ElementId {
        self.id
    }
}
