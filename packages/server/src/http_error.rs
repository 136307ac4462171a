//! HTTP error handling for the registry server
//!
//! Every failure is returned as a JSON body `{message, code, details?}`; the
//! code decides the status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use registry_core::ResolveError;
use serde::{Deserialize, Serialize};

/// JSON error response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    /// Optional detailed error information for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HttpError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: Some(details.into()),
        }
    }

    pub fn item_not_found(what: impl std::fmt::Display) -> Self {
        Self::new(format!("Item not found: {}", what), "ITEM_NOT_FOUND")
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "ITEM_NOT_FOUND" | "NODE_NOT_FOUND" => StatusCode::NOT_FOUND,
            "INVALID_INPUT" => StatusCode::BAD_REQUEST,
            "UNRESOLVED_RELATION" | "AMBIGUOUS_TYPE" => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ResolveError> for HttpError {
    fn from(err: ResolveError) -> Self {
        let code = match &err {
            ResolveError::NodeNotFound { .. } => "NODE_NOT_FOUND",
            ResolveError::UnresolvedRelation { .. } => "UNRESOLVED_RELATION",
            ResolveError::AmbiguousType(_) => "AMBIGUOUS_TYPE",
            ResolveError::NestingTooDeep { .. } => "NESTING_TOO_DEEP",
            ResolveError::InvalidConfig(_) => "INVALID_CONFIG",
            ResolveError::Store(_) => "STORE_ERROR",
        };
        match &err {
            ResolveError::Store(inner) => {
                HttpError::with_details(err.to_string(), code, format!("{:?}", inner))
            }
            _ => HttpError::new(err.to_string(), code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            HttpError::item_not_found("x").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            HttpError::new("bad", "INVALID_INPUT").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HttpError::new("boom", "STORE_ERROR").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_resolve_error() {
        let err: HttpError = ResolveError::node_not_found("n1").into();
        assert_eq!(err.code, "NODE_NOT_FOUND");
        assert!(err.message.contains("n1"));
        assert!(err.details.is_none());

        let err: HttpError = ResolveError::unresolved("n2", "register").into();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err: HttpError = ResolveError::Store(anyhow::anyhow!("disk gone")).into();
        assert_eq!(err.code, "STORE_ERROR");
        assert!(err.details.is_some());
    }

    #[test]
    fn test_details_are_skipped_when_absent() {
        let json = serde_json::to_value(HttpError::new("m", "C")).unwrap();
        assert_eq!(json["message"], "m");
        assert!(json.get("details").is_none());
    }
}
