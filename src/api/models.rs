// src/api/models.rs

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::{StatusError, SubmitError, TargetError};
use crate::core::models::{ScanCategory, ScanOptions};
use crate::core::orchestrator::SubmitRequest;

/// Body of `POST /api/v1/scans`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScanRequest {
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub scan_category: Option<String>,
    #[serde(default)]
    pub scan_options: Option<Value>,
}

impl TryFrom<CreateScanRequest> for SubmitRequest {
    type Error = TargetError;

    fn try_from(body: CreateScanRequest) -> Result<Self, Self::Error> {
        let target = body.target.ok_or_else(|| {
            TargetError::Validation("a target (domain or IP address) is required".to_string())
        })?;
        let options = match body.scan_options {
            None | Some(Value::Null) => ScanOptions::new(),
            Some(Value::Object(map)) => ScanOptions::from_json(map)?,
            Some(_) => {
                return Err(TargetError::Validation(
                    "scanOptions must be a JSON object".to_string(),
                ));
            }
        };
        Ok(SubmitRequest {
            target,
            category: ScanCategory::parse_lenient(body.scan_category.as_deref()),
            options,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_kind: String,
    pub message: String,
}

/// Every failure the HTTP layer can report.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "VALIDATION_ERROR",
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "NOT_FOUND",
            message: message.into(),
        }
    }

    fn persistence(message: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "PERSISTENCE_ERROR",
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error_kind: self.kind.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<TargetError> for ApiError {
    fn from(e: TargetError) -> Self {
        match e {
            TargetError::Validation(message) => Self::validation(message),
            TargetError::Resolution { .. } => Self {
                status: StatusCode::BAD_REQUEST,
                kind: "RESOLUTION_ERROR",
                message: e.to_string(),
            },
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Target(target) => target.into(),
            SubmitError::Persistence(_) => Self::persistence(e.to_string()),
        }
    }
}

impl From<StatusError> for ApiError {
    fn from(e: StatusError) -> Self {
        match e {
            StatusError::NotFound(_) => Self::not_found(e.to_string()),
            StatusError::Persistence(_) => Self::persistence(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> Result<SubmitRequest, TargetError> {
        serde_json::from_value::<CreateScanRequest>(body).unwrap().try_into()
    }

    #[test]
    fn category_and_options_are_optional() {
        let request = parse(json!({ "target": "example.com" })).unwrap();
        assert_eq!(request.category, ScanCategory::Quick);
        assert!(request.options.is_empty());
    }

    #[test]
    fn unknown_category_falls_back_to_quick() {
        let request = parse(json!({ "target": "example.com", "scanCategory": "DEEP" })).unwrap();
        assert_eq!(request.category, ScanCategory::Quick);
        let request = parse(json!({ "target": "example.com", "scanCategory": "ssl" })).unwrap();
        assert_eq!(request.category, ScanCategory::Ssl);
    }

    #[test]
    fn missing_target_and_bad_options_are_validation_errors() {
        assert!(matches!(parse(json!({})), Err(TargetError::Validation(_))));
        assert!(matches!(
            parse(json!({ "target": "example.com", "scanOptions": [1, 2] })),
            Err(TargetError::Validation(_))
        ));
    }

    #[test]
    fn resolution_errors_are_client_errors() {
        let error: ApiError = TargetError::Resolution {
            host: "nonexistent.invalid".into(),
            cause: "NXDOMAIN".into(),
        }
        .into();
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert_eq!(error.kind, "RESOLUTION_ERROR");
    }
}
