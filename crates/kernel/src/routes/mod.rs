//! HTTP route handlers.

pub mod health;
pub mod index;
pub mod pages;

use axum::Router;
use axum::middleware::from_fn_with_state;
use tower_http::trace::TraceLayer;

use crate::auth::authenticate_api_token;
use crate::error::AppError;
use crate::state::AppState;

/// Build the application router with authentication and request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(index::router())
        .merge(pages::router())
        .merge(health::router())
        .fallback(|| async { AppError::no_route() })
        .layer(from_fn_with_state(state.clone(), authenticate_api_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
