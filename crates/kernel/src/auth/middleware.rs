//! API token authentication middleware.
//!
//! Checks for `Authorization: Bearer <token>` headers and, if valid,
//! attaches the matching [`Caller`] to the request extensions.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::Caller;
use crate::error::AppError;
use crate::state::AppState;

/// Middleware that authenticates via Bearer token.
///
/// - Valid token -> the token owner's `Caller` is attached
/// - Unknown token -> 401 `rest_invalid_token`
/// - No header -> the request continues as anonymous
pub async fn authenticate_api_token(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let raw_token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let caller = match raw_token {
        None => Caller::anonymous(),
        Some(token) => match state.users().authenticate(token) {
            Some(user) => {
                debug!(user_id = user.id, role = user.role.as_str(), "API token accepted");
                Caller::for_user(&user)
            }
            None => {
                debug!("unknown API token rejected");
                return AppError::InvalidToken.into_response();
            }
        },
    };

    request.extensions_mut().insert(caller);
    next.run(request).await
}
