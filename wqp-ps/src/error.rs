//! Error types for wqp-ps

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Body is not a JSON object (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Pipeline error, mapped by variant
    #[error(transparent)]
    Pipeline(#[from] wqp_common::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(err) if err.is_request_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        use wqp_common::Error;

        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Pipeline(err) => match err {
                Error::MissingField(_) => "MISSING_FIELD",
                Error::InvalidFieldType { .. } => "INVALID_FIELD_TYPE",
                Error::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
                Error::ArtifactLoad { .. } => "ARTIFACT_LOAD",
                _ => "INTERNAL_ERROR",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use wqp_common::{Error, FeatureName};

    #[test]
    fn test_request_errors_map_to_400() {
        let err = ApiError::from(Error::MissingField(FeatureName::Ph));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "MISSING_FIELD");

        let err = ApiError::from(Error::InvalidFieldType {
            field: FeatureName::Alcohol,
            found: "string".to_string(),
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "INVALID_FIELD_TYPE");
    }

    #[test]
    fn test_bad_request_maps_to_400() {
        let err = ApiError::BadRequest("expected a JSON object".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "BAD_REQUEST");
    }

    #[test]
    fn test_schema_mismatch_maps_to_500() {
        let err = ApiError::from(Error::SchemaMismatch {
            context: "scaling transform".to_string(),
            expected: "11 features".to_string(),
            found: "9 features".to_string(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "SCHEMA_MISMATCH");
    }
}
