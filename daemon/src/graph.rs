use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::property::PropertyValue;
use gremlin_core::{Edge, Graph, Vertex, VertexId};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::DaemonConfig;
use crate::error::Result;

pub type GraphHandle = Arc<Graph>;

/// Builds the process-wide graph, optionally hydrated from a JSON seed
/// file of vertices and edges.
pub fn shared_graph(config: &DaemonConfig) -> Result<GraphHandle> {
    let graph = Graph::new();
    if let Some(path) = config.graph().seed.as_ref() {
        log::info!("loading graph seed from {}", path.display());
        load_seed(&graph, path)?;
    }
    Ok(Arc::new(graph))
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    vertices: Vec<SeedVertex>,
    #[serde(default)]
    edges: Vec<SeedEdge>,
}

#[derive(Debug, Deserialize)]
struct SeedVertex {
    id: Option<SeedId>,
    #[serde(default)]
    properties: HashMap<String, PropertyValue>,
}

#[derive(Debug, Deserialize)]
struct SeedEdge {
    id: Option<SeedId>,
    label: String,
    source: SeedId,
    target: SeedId,
    #[serde(default)]
    properties: HashMap<String, PropertyValue>,
}

/// Seed ids may be decimal integers or full UUID strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedId {
    Number(u64),
    Text(String),
}

impl SeedId {
    fn resolve(&self) -> Option<Uuid> {
        match self {
            SeedId::Number(id) => Some(Uuid::from_u128(*id as u128)),
            SeedId::Text(raw) => Uuid::parse_str(raw)
                .ok()
                .or_else(|| raw.parse::<u128>().ok().map(Uuid::from_u128)),
        }
    }
}

fn load_seed(graph: &Graph, path: &Path) -> Result<()> {
    let raw = fs::read_to_string(path)?;
    let seed: SeedFile = serde_json::from_str(&raw)?;

    for entry in seed.vertices {
        let id = match entry.id.as_ref() {
            Some(id) => match id.resolve() {
                Some(id) => id,
                None => {
                    log::warn!("skipping seed vertex with unparseable id {id:?}");
                    continue;
                }
            },
            None => VertexId::new_v4(),
        };
        graph.add_vertex(Vertex::new(id, entry.properties));
    }

    for entry in seed.edges {
        let (Some(source), Some(target)) = (entry.source.resolve(), entry.target.resolve()) else {
            log::warn!("skipping seed edge {} with unparseable endpoint", entry.label);
            continue;
        };
        let id = entry
            .id
            .as_ref()
            .and_then(SeedId::resolve)
            .unwrap_or_else(Uuid::new_v4);
        if let Err(err) = graph.add_edge(Edge::new(id, entry.label, source, target, entry.properties))
        {
            log::warn!("failed to seed edge {id}: {err}");
        }
    }

    log::info!(
        "seeded graph with {} vertices and {} edges",
        graph.vertex_count(),
        graph.edge_count()
    );

    Ok(())
}
