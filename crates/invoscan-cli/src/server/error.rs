use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

use invoscan_core::ScanError;

use super::models::ErrorResponse;

pub const UPLOAD_FAILED_MESSAGE: &str = "There was an error uploading the file";
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid or missing API key";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid or missing API key")]
    Unauthorized,

    #[error("Bad upload: {0}")]
    Upload(String),

    #[error("Invoice processing failed: {source}")]
    Scan {
        #[from]
        source: ScanError,
    },

    #[error("Worker task failed: {source}")]
    Worker {
        #[from]
        source: tokio::task::JoinError,
    },
}

impl IntoResponse for AppError {
    /// Clients only ever see a generic message; the cause is logged.
    ///
    /// Upload and processing failures still answer 200 with the generic
    /// body; only a rejected key changes the status.
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized => {
                tracing::warn!("Rejected request: {}", self);
                (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE)
            }
            _ => {
                tracing::error!("{}", self);
                (StatusCode::OK, UPLOAD_FAILED_MESSAGE)
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invoscan_core::RenderError;

    async fn body_message(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        body.message
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Unauthorized.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Upload("no file field".to_string()).into_response().status(),
            StatusCode::OK
        );

        let scan: AppError = ScanError::from(RenderError::NoPages).into();
        assert_eq!(scan.into_response().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_failure_body_is_generic() {
        let scan: AppError = ScanError::from(RenderError::NoPages).into();
        let response = scan.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_message(response).await, UPLOAD_FAILED_MESSAGE);

        let response = AppError::Upload("missing 'file' field".to_string()).into_response();
        assert_eq!(body_message(response).await, "There was an error uploading the file");
    }

    #[tokio::test]
    async fn test_unauthorized_body() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_message(response).await, UNAUTHORIZED_MESSAGE);
    }
}
