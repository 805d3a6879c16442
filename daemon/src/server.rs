use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use gremlin_core::script::ScriptEngine;
use tower::limit::ConcurrencyLimitLayer;
use uuid::Uuid;

use crate::config::DaemonConfig;
use crate::envelope::{self, Scope};
use crate::error::Result;
use crate::executor::{execute, ExecutionContext, QueryError, ScriptRequest};
use crate::graph::GraphHandle;
use crate::signals::ShutdownSignal;

#[derive(Clone)]
struct AppState {
    graph: GraphHandle,
    engine: Arc<dyn ScriptEngine>,
}

pub async fn run(
    config: &DaemonConfig,
    graph: GraphHandle,
    engine: Arc<dyn ScriptEngine>,
    shutdown: ShutdownSignal,
) -> Result<()> {
    let addr = config.socket_addr()?;
    let state = AppState { graph, engine };

    let mut app = Router::new()
        .route("/gremlin", post(evaluate_on_graph))
        .route("/vertices/:id/gremlin", post(evaluate_on_vertex))
        .route("/edges/:id/gremlin", post(evaluate_on_edge))
        .with_state(state);

    if let Some(limit) = config.server().body_limit {
        app = app.layer(DefaultBodyLimit::max(limit));
    }

    if let Some(limit) = config.server().concurrency_limit {
        app = app.layer(ConcurrencyLimitLayer::new(limit));
    }

    log::info!("listening on {addr}");

    let mut server = axum::Server::bind(&addr).tcp_nodelay(config.server().tcp_nodelay);
    if config.server().http2_only {
        server = server.http2_only(true);
    }

    server
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown.wait())
        .await?;

    Ok(())
}

async fn evaluate_on_graph(
    State(state): State<AppState>,
    request: Option<Json<ScriptRequest>>,
) -> Response {
    let context = ExecutionContext::graph_scoped(state.graph.clone());
    respond(&state, Scope::Graph, context, unwrap_request(request))
}

async fn evaluate_on_vertex(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Option<Json<ScriptRequest>>,
) -> Response {
    let Some(vertex) = parse_element_id(&id).and_then(|id| state.graph.vertex(id)) else {
        return unknown_element(Scope::Vertex, format!("vertex {id} not found"));
    };
    let context = ExecutionContext::vertex_scoped(state.graph.clone(), vertex);
    respond(&state, Scope::Vertex, context, unwrap_request(request))
}

async fn evaluate_on_edge(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Option<Json<ScriptRequest>>,
) -> Response {
    let Some(edge) = parse_element_id(&id).and_then(|id| state.graph.edge(id)) else {
        return unknown_element(Scope::Edge, format!("edge {id} not found"));
    };
    let context = ExecutionContext::edge_scoped(state.graph.clone(), edge);
    respond(&state, Scope::Edge, context, unwrap_request(request))
}

/// A missing or undecodable body behaves like an empty request, so the
/// pipeline's own validation produces the error envelope.
fn unwrap_request(request: Option<Json<ScriptRequest>>) -> ScriptRequest {
    request.map(|Json(request)| request).unwrap_or_default()
}

/// Every outcome is an envelope; the status code is only host framing on
/// top of it.
fn respond(
    state: &AppState,
    scope: Scope,
    context: ExecutionContext,
    request: ScriptRequest,
) -> Response {
    match execute(state.engine.as_ref(), &context, &request) {
        Ok(results) => (StatusCode::OK, Json(envelope::success(results))).into_response(),
        Err(err) => {
            let status = match &err {
                QueryError::MissingScript | QueryError::Eval(_) => StatusCode::BAD_REQUEST,
                QueryError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(envelope::error(err.to_string(), scope))).into_response()
        }
    }
}

fn unknown_element(scope: Scope, message: String) -> Response {
    (StatusCode::NOT_FOUND, Json(envelope::error(message, scope))).into_response()
}

/// Path ids parse as a UUID or as a decimal integer.
fn parse_element_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw)
        .ok()
        .or_else(|| raw.parse::<u128>().ok().map(Uuid::from_u128))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_ids_parse_as_uuid_or_integer() {
        assert_eq!(parse_element_id("7"), Some(Uuid::from_u128(7)));

        let uuid = Uuid::new_v4();
        assert_eq!(parse_element_id(&uuid.to_string()), Some(uuid));

        assert!(parse_element_id("not-an-id").is_none());
    }
}
