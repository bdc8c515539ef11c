use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

use crate::db::services::LinkServiceError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("All fields are required")]
    MissingFields { received: Value },
    #[error("Invalid data provided")]
    ValidationFailed { details: Value },
    #[error("Invalid link ID format")]
    InvalidId,
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, extra) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::MissingFields { received } => (
                StatusCode::BAD_REQUEST,
                "All fields are required".to_string(),
                Some(("receivedData", received)),
            ),
            AppError::ValidationFailed { details } => (
                StatusCode::BAD_REQUEST,
                "Invalid data provided".to_string(),
                Some(("details", details)),
            ),
            AppError::InvalidId => (
                StatusCode::BAD_REQUEST,
                "Invalid link ID format".to_string(),
                None,
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::DatabaseError(msg) | AppError::InternalServerError(msg) => {
                error!(error = %msg, "Request failed with an internal error.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "success": false,
            "message": message,
            "error": message,
        });
        if let (Some((key, value)), Some(map)) = (extra, body.as_object_mut()) {
            map.insert(key.to_string(), value);
        }
        (status, Json(body)).into_response()
    }
}

impl From<LinkServiceError> for AppError {
    fn from(err: LinkServiceError) -> Self {
        match err {
            LinkServiceError::DbErr(e) => AppError::DatabaseError(e.to_string()),
            LinkServiceError::NotFound(_) => AppError::NotFound("Link not found".to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<tera::Error> for AppError {
    fn from(err: tera::Error) -> Self {
        AppError::InternalServerError(format!("Template rendering error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_missing_fields_echoes_received_data() {
        let (status, body) = render(AppError::MissingFields {
            received: json!({ "linkName": "docs" }),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "All fields are required");
        assert_eq!(body["receivedData"]["linkName"], "docs");
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let (status, body) = render(AppError::DatabaseError("connection reset".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
        assert!(!body.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_not_found_from_service_error() {
        let err: AppError = LinkServiceError::NotFound(uuid::Uuid::new_v4()).into();
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Link not found");
    }
}
