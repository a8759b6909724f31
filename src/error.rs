use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::store::StoreError;

/// Error body returned to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Failure taxonomy of the HTTP surface.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input; each entry names one offending field.
    #[error("invalid input: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{0}")]
    BadRequest(String),

    /// Missing credentials or wrong email/password.
    #[error("{0}")]
    Authentication(&'static str),

    /// A bearer token was presented but is tampered or expired.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Router wired in an order that leaves a guard without an identity.
    #[error("server misconfiguration: {0}")]
    Misconfigured(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Detail of a 500 response, kept on the response for [`reveal_internal_details`].
#[derive(Debug, Clone)]
pub struct InternalDetails(pub String);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Misconfigured(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => "VALIDATION_ERROR",
            AppError::Authentication(_) | AppError::InvalidToken => "AUTHENTICATION_ERROR",
            AppError::Forbidden(_) => "AUTHORIZATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Misconfigured(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let hidden = match &self {
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                Some(format!("{e:#}"))
            }
            AppError::Misconfigured(what) => {
                error!(what, "router misconfiguration");
                Some(self.to_string())
            }
            _ => None,
        };

        if let Some(details) = hidden {
            let body = ErrorBody {
                error: code.into(),
                message: "Internal server error".into(),
                details: None,
            };
            let mut res = (status, Json(body)).into_response();
            res.extensions_mut().insert(InternalDetails(details));
            return res;
        }

        let body = ErrorBody {
            error: code.into(),
            message: self.to_string(),
            details: None,
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::NotFound(what) => AppError::NotFound(what.into()),
            StoreError::Backend(e) => AppError::Internal(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection, "rejected request body");
        AppError::Validation(vec![format!("body: {}", rejection.body_text())])
    }
}

/// Response mapper mounted in development mode: puts the hidden detail of a
/// 500 back into the body.
pub async fn reveal_internal_details(mut res: Response) -> Response {
    match res.extensions_mut().remove::<InternalDetails>() {
        Some(InternalDetails(details)) => {
            let body = ErrorBody {
                error: "INTERNAL_ERROR".into(),
                message: "Internal server error".into(),
                details: Some(details),
            };
            (res.status(), Json(body)).into_response()
        }
        None => res,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(res: Response) -> ErrorBody {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_lists_every_field() {
        let err = AppError::Validation(vec!["name: required".into(), "email: invalid".into()]);
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_of(res).await;
        assert_eq!(body.error, "VALIDATION_ERROR");
        assert!(body.message.contains("name"));
        assert!(body.message.contains("email"));
    }

    #[tokio::test]
    async fn internal_error_hides_details() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.extensions().get::<InternalDetails>().is_some());
        let body = body_of(res).await;
        assert!(body.details.is_none());
        assert!(!body.message.contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn reveal_surfaces_details_in_development() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused"));
        let res = reveal_internal_details(err.into_response()).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(res).await;
        assert_eq!(body.details.as_deref(), Some("connection refused"));
    }

    #[test]
    fn store_errors_map_to_taxonomy() {
        let conflict: AppError = StoreError::Conflict("Email already registered".into()).into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        let missing: AppError = StoreError::NotFound("user").into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        let backend: AppError = StoreError::Backend(anyhow::anyhow!("boom")).into();
        assert_eq!(backend.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
