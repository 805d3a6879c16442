use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use common::edge::{Edge, EdgeId};
use common::vertex::{Vertex, VertexId};
use thiserror::Error;

pub type GraphResult<T> = Result<T, GraphError>;

/// Errors raised by graph mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("unknown vertex {0}")]
    UnknownVertex(VertexId),
    #[error("unknown edge {0}")]
    UnknownEdge(EdgeId),
}

/// Direction of incidence relative to a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
    Both,
}

#[derive(Default)]
struct Topology {
    vertices: HashMap<VertexId, Arc<Vertex>>,
    edges: HashMap<EdgeId, Arc<Edge>>,
    adjacency: HashMap<VertexId, Vec<EdgeId>>,
}

/// Shared in-memory property graph.
///
/// All access goes through one read/write lock, so a single instance can be
/// read and mutated by concurrent request handlers. Scripts are allowed to
/// race on graph state; the lock only keeps the topology itself consistent.
#[derive(Default)]
pub struct Graph {
    topology: RwLock<Topology>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&self, vertex: Vertex) -> Arc<Vertex> {
        let mut topology = self.topology.write().expect("graph lock poisoned");
        let vertex = Arc::new(vertex);
        topology.adjacency.entry(vertex.id()).or_default();
        topology.vertices.insert(vertex.id(), vertex.clone());
        vertex
    }

    /// Inserts an edge; both endpoints must already exist.
    pub fn add_edge(&self, edge: Edge) -> GraphResult<Arc<Edge>> {
        let mut topology = self.topology.write().expect("graph lock poisoned");
        if !topology.vertices.contains_key(&edge.source()) {
            return Err(GraphError::UnknownVertex(edge.source()));
        }
        if !topology.vertices.contains_key(&edge.target()) {
            return Err(GraphError::UnknownVertex(edge.target()));
        }

        let id = edge.id();
        let source = edge.source();
        let target = edge.target();
        let edge = Arc::new(edge);
        topology.edges.insert(id, edge.clone());
        Self::link_edge(&mut topology.adjacency, source, id);
        if target != source {
            Self::link_edge(&mut topology.adjacency, target, id);
        }
        Ok(edge)
    }

    pub fn vertex(&self, id: VertexId) -> Option<Arc<Vertex>> {
        let topology = self.topology.read().expect("graph lock poisoned");
        topology.vertices.get(&id).cloned()
    }

    pub fn edge(&self, id: EdgeId) -> Option<Arc<Edge>> {
        let topology = self.topology.read().expect("graph lock poisoned");
        topology.edges.get(&id).cloned()
    }

    pub fn remove_edge(&self, id: EdgeId) -> Option<Arc<Edge>> {
        let mut topology = self.topology.write().expect("graph lock poisoned");
        let edge = topology.edges.remove(&id)?;
        let source = edge.source();
        let target = edge.target();

        Self::unlink_edge(&mut topology.adjacency, source, id);
        Self::unlink_edge(&mut topology.adjacency, target, id);

        Some(edge)
    }

    /// Removes a vertex along with every incident edge.
    pub fn remove_vertex(&self, id: VertexId) -> Option<Arc<Vertex>> {
        let mut topology = self.topology.write().expect("graph lock poisoned");
        let vertex = topology.vertices.remove(&id)?;
        if let Some(edges) = topology.adjacency.remove(&id) {
            for edge_id in edges {
                if let Some(edge) = topology.edges.remove(&edge_id) {
                    let other = if edge.source() == id {
                        edge.target()
                    } else {
                        edge.source()
                    };
                    Self::unlink_edge(&mut topology.adjacency, other, edge_id);
                }
            }
        }
        Some(vertex)
    }

    /// Drops every vertex and edge.
    pub fn clear(&self) {
        let mut topology = self.topology.write().expect("graph lock poisoned");
        *topology = Topology::default();
    }

    pub fn vertex_count(&self) -> usize {
        let topology = self.topology.read().expect("graph lock poisoned");
        topology.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        let topology = self.topology.read().expect("graph lock poisoned");
        topology.edges.len()
    }

    /// Snapshot of every vertex, sorted by id so iteration order is stable.
    pub fn vertices(&self) -> Vec<Arc<Vertex>> {
        let topology = self.topology.read().expect("graph lock poisoned");
        let mut vertices: Vec<Arc<Vertex>> = topology.vertices.values().cloned().collect();
        vertices.sort_by_key(|vertex| vertex.id());
        vertices
    }

    /// Snapshot of every edge, sorted by id so iteration order is stable.
    pub fn edges(&self) -> Vec<Arc<Edge>> {
        let topology = self.topology.read().expect("graph lock poisoned");
        let mut edges: Vec<Arc<Edge>> = topology.edges.values().cloned().collect();
        edges.sort_by_key(|edge| edge.id());
        edges
    }

    /// Edges incident to a vertex in the given direction, optionally
    /// restricted to a label, in adjacency order.
    pub fn incident_edges(
        &self,
        vertex_id: VertexId,
        direction: Direction,
        label: Option<&str>,
    ) -> Vec<Arc<Edge>> {
        let topology = self.topology.read().expect("graph lock poisoned");
        topology
            .adjacency
            .get(&vertex_id)
            .into_iter()
            .flat_map(|edge_ids| edge_ids.iter())
            .filter_map(|edge_id| topology.edges.get(edge_id).cloned())
            .filter(|edge| match direction {
                Direction::Out => edge.source() == vertex_id,
                Direction::In => edge.target() == vertex_id,
                Direction::Both => true,
            })
            .filter(|edge| label.map_or(true, |label| edge.label() == label))
            .collect()
    }

    /// Vertices adjacent to a vertex through matching edges, sorted by id.
    pub fn neighbors(
        &self,
        vertex_id: VertexId,
        direction: Direction,
        label: Option<&str>,
    ) -> Vec<Arc<Vertex>> {
        let incident = self.incident_edges(vertex_id, direction, label);
        let topology = self.topology.read().expect("graph lock poisoned");
        let mut neighbors: Vec<Arc<Vertex>> = incident
            .iter()
            .filter_map(|edge| {
                let other = if edge.source() == vertex_id {
                    edge.target()
                } else {
                    edge.source()
                };
                topology.vertices.get(&other).cloned()
            })
            .collect();
        neighbors.sort_by_key(|vertex| vertex.id());
        neighbors.dedup_by_key(|vertex| vertex.id());
        neighbors
    }

    fn link_edge(adjacency: &mut HashMap<VertexId, Vec<EdgeId>>, vertex_id: VertexId, edge_id: EdgeId) {
        let entry = adjacency.entry(vertex_id).or_default();
        if !entry.contains(&edge_id) {
            entry.push(edge_id);
        }
    }

    fn unlink_edge(
        adjacency: &mut HashMap<VertexId, Vec<EdgeId>>,
        vertex_id: VertexId,
        edge_id: EdgeId,
    ) {
        if let Some(entry) = adjacency.get_mut(&vertex_id) {
            entry.retain(|candidate| *candidate != edge_id);
        }
    }
}
