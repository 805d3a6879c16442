use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::property::{Element, ElementId, PropertyContainer, PropertyValue};

pub type VertexId = ElementId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    id: VertexId,
    properties: HashMap<String, PropertyValue>,
}

impl Vertex {
    pub fn new(id: VertexId, properties: HashMap<String, PropertyValue>) -> Self {
        Self { id, properties }
    }

    pub fn id(&self) -> VertexId {
        self.id
    }
}

impl PropertyContainer for Vertex {
    fn properties(&self) -> &HashMap<String, PropertyValue> {
        &self.properties
    }
}

impl Element for Vertex {
    fn element_id(&self) -> ElementId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn new_preserves_id() {
        let id = VertexId::from_u128(1);
        let vertex = Vertex::new(id, HashMap::new());

        assert_eq!(vertex.id(), id);
    }

    #[test]
    fn property_container_exposes_properties() {
        let id = VertexId::from_u128(2);
        let mut properties = HashMap::new();
        properties.insert(
            "first_name".to_string(),
            PropertyValue::String("Ada".to_string()),
        );
        let vertex = Vertex::new(id, properties);

        let value = vertex.property("first_name");

        match value {
            Some(PropertyValue::String(name)) => assert_eq!(name, "Ada"),
            other => panic!("unexpected property: {:?}", other),
        }
    }
}
