//! Application error types.
//!
//! Every failure reaches the client as
//! `{"code": "...", "message": "...", "data": {"status": N}}` with a stable
//! machine-readable code.

use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::auth::Caller;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    #[error("{message}")]
    BadRequest {
        code: &'static str,
        message: String,
        /// Offending parameter -> reason.
        params: BTreeMap<String, String>,
    },

    #[error("{message}")]
    Forbidden {
        code: &'static str,
        message: String,
        /// 401 for anonymous callers, 403 for authenticated ones.
        status: StatusCode,
    },

    #[error("invalid API token")]
    InvalidToken,

    #[error("{message}")]
    Gone { code: &'static str, message: String },
}

impl AppError {
    /// No page with this id (or the record is not a page).
    pub fn page_not_found() -> Self {
        Self::NotFound {
            code: "rest_post_invalid_id",
            message: "Invalid post ID.".to_string(),
        }
    }

    /// Path did not match a route.
    pub fn no_route() -> Self {
        Self::NotFound {
            code: "rest_no_route",
            message: "No route was found matching the URL and request method.".to_string(),
        }
    }

    /// A referenced page id (such as `parent`) is invalid.
    pub fn invalid_id(message: &str) -> Self {
        Self::BadRequest {
            code: "rest_post_invalid_id",
            message: message.to_string(),
            params: BTreeMap::new(),
        }
    }

    /// A single parameter failed validation.
    pub fn invalid_param(name: &str, reason: impl Into<String>) -> Self {
        let mut params = BTreeMap::new();
        params.insert(name.to_string(), reason.into());
        Self::invalid_params(params)
    }

    /// One or more parameters failed validation.
    pub fn invalid_params(params: BTreeMap<String, String>) -> Self {
        let names: Vec<&str> = params.keys().map(String::as_str).collect();
        Self::BadRequest {
            code: "rest_invalid_param",
            message: format!("Invalid parameter(s): {}", names.join(", ")),
            params,
        }
    }

    /// Other client errors carrying their own code.
    pub fn bad_request(code: &'static str, message: &str) -> Self {
        Self::BadRequest {
            code,
            message: message.to_string(),
            params: BTreeMap::new(),
        }
    }

    /// Capability failure. Anonymous callers get 401 so clients know to
    /// authenticate; authenticated callers get 403.
    pub fn forbidden(caller: &Caller, code: &'static str, message: &str) -> Self {
        let status = if caller.is_authenticated() {
            StatusCode::FORBIDDEN
        } else {
            StatusCode::UNAUTHORIZED
        };
        Self::Forbidden {
            code,
            message: message.to_string(),
            status,
        }
    }

    pub fn already_trashed() -> Self {
        Self::Gone {
            code: "rest_already_trashed",
            message: "The post has already been deleted.".to_string(),
        }
    }

    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Internal(_) => "rest_internal",
            Self::NotFound { code, .. }
            | Self::BadRequest { code, .. }
            | Self::Forbidden { code, .. }
            | Self::Gone { code, .. } => code,
            Self::InvalidToken => "rest_invalid_token",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Forbidden { status, .. } => *status,
            Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::Gone { .. } => StatusCode::GONE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details are logged, never returned
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let mut data = json!({ "status": status.as_u16() });
        if let AppError::BadRequest { params, .. } = &self {
            if !params.is_empty() {
                data["params"] = json!(params);
            }
        }

        let body = json!({
            "code": self.code(),
            "message": message,
            "data": data,
        });

        (status, Json(body)).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    #[test]
    fn forbidden_status_depends_on_authentication() {
        let anon = AppError::forbidden(&Caller::anonymous(), "rest_cannot_create", "no");
        assert_eq!(anon.status(), StatusCode::UNAUTHORIZED);

        let author = Caller {
            user_id: 3,
            role: Some(Role::Author),
        };
        let denied = AppError::forbidden(&author, "rest_cannot_create", "no");
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
        assert_eq!(denied.code(), "rest_cannot_create");
    }

    #[test]
    fn invalid_params_lists_names() {
        let mut params = BTreeMap::new();
        params.insert("per_page".to_string(), "too big".to_string());
        params.insert("order".to_string(), "bad".to_string());

        let err = AppError::invalid_params(params);
        assert_eq!(err.code(), "rest_invalid_param");
        assert_eq!(err.to_string(), "Invalid parameter(s): order, per_page");
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::from(anyhow::anyhow!("connection refused"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "internal server error");
    }
}
