// HTTP error type and the JSON envelope every handler responds with.

use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::analytics::AnalyticsError;

pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

/// `{"success": true, "data": ...}`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(Envelope {
        success: true,
        data,
    }))
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    NoData(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::NoData(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(e) => {
                let message = format!("{:#}", e);
                tracing::error!(error = %message, "request failed");
                message
            }
            other => other.to_string(),
        };
        let body = serde_json::json!({
            "success": false,
            "error": message,
        });
        (status, Json(body)).into_response()
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(e: AnalyticsError) -> Self {
        match e {
            AnalyticsError::InvalidDate { .. }
            | AnalyticsError::MissingBounds
            | AnalyticsError::UnknownMetric(_) => ApiError::BadRequest(e.to_string()),
            AnalyticsError::InsufficientData(_) | AnalyticsError::NoData(_) => {
                ApiError::NoData(e.to_string())
            }
            AnalyticsError::Store(inner) => ApiError::Internal(inner),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analytics_errors_map_to_status() {
        let bad: ApiError = AnalyticsError::InvalidDate {
            value: "yesterday".into(),
        }
        .into();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        assert!(bad.to_string().contains("yesterday"));

        let missing: ApiError = AnalyticsError::NoData("no samples".into()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let store: ApiError = AnalyticsError::Store(anyhow::anyhow!("disk gone")).into();
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn internal_error_body_carries_description() {
        let err = ApiError::Internal(anyhow::anyhow!("disk gone").context("loading volunteers"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("loading volunteers"), "{}", message);
        assert!(message.contains("disk gone"), "{}", message);
    }
}
