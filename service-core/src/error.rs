use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Message shown to clients for any failure whose details stay server-side.
pub const SERVER_ERROR_MESSAGE: &str = "Server Error";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    pub fn bad_request(message: &'static str) -> Self {
        AppError::BadRequest(anyhow::anyhow!(message))
    }

    pub fn not_found(message: &'static str) -> Self {
        AppError::NotFound(anyhow::anyhow!(message))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalError(_) | AppError::DatabaseError(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            success: bool,
            message: String,
        }

        let status = self.status();
        let message = match self {
            AppError::BadRequest(err) | AppError::NotFound(err) => err.to_string(),
            AppError::InternalError(_) | AppError::DatabaseError(_) | AppError::ConfigError(_) => {
                SERVER_ERROR_MESSAGE.to_string()
            }
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn bad_request_keeps_its_message() {
        let (status, body) = body_json(AppError::bad_request("Please provide at least one product")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Please provide at least one product");
    }

    #[tokio::test]
    async fn database_error_hides_driver_details() {
        let (status, body) =
            body_json(AppError::DatabaseError(anyhow::anyhow!("connection refused"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], SERVER_ERROR_MESSAGE);
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn driver_errors_become_database_errors() {
        let driver_err = mongodb::options::ClientOptions::parse("not-a-mongodb-uri")
            .await
            .unwrap_err();
        let err = AppError::from(driver_err);

        assert!(matches!(err, AppError::DatabaseError(_)));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], SERVER_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn not_found_renders_404() {
        let (status, body) = body_json(AppError::not_found("product not found")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "product not found");
    }
}
