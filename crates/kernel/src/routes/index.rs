//! Namespace index: lists the routes registered under `/wp/v2`.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Map, Value, json};

use super::pages;
use crate::content::{NAMESPACE, REST_BASE};
use crate::state::AppState;

async fn namespace_index(State(state): State<AppState>) -> Json<Value> {
    let service = state.pages();

    let mut routes = Map::new();
    routes.insert(
        format!("/{NAMESPACE}"),
        json!({
            "namespace": NAMESPACE,
            "methods": ["GET"],
            "endpoints": [{ "methods": ["GET"], "args": {} }],
        }),
    );
    routes.insert(
        format!("/{NAMESPACE}/{REST_BASE}"),
        pages::collection_route(service),
    );
    routes.insert(pages::item_route_pattern(), pages::item_route(service));

    Json(json!({
        "namespace": NAMESPACE,
        "routes": routes,
    }))
}

/// Create the namespace index router.
pub fn router() -> Router<AppState> {
    Router::new().route("/wp/v2", get(namespace_index))
}
