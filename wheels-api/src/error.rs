use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use wheels_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    AuthenticationError(String),
    #[error("{0}")]
    AuthorizationError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFoundError(String),
    #[error("{0}")]
    CapacityError(String),
    #[error("Booking is already cancelled")]
    AlreadyCancelled,
    #[error("Trip has been cancelled")]
    TripCancelled,
    #[error("{0}")]
    ConflictError(String),
    #[error("Too many requests, try again later")]
    RateLimited,
    #[error("{0}")]
    InternalServerError(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::AuthenticationError(_) => (StatusCode::UNAUTHORIZED, "AUTHENTICATION"),
            AppError::AuthorizationError(_) => (StatusCode::FORBIDDEN, "AUTHORIZATION"),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "VALIDATION"),
            AppError::NotFoundError(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::CapacityError(_) => (StatusCode::CONFLICT, "CAPACITY"),
            AppError::AlreadyCancelled => (StatusCode::CONFLICT, "ALREADY_CANCELLED"),
            AppError::TripCancelled => (StatusCode::CONFLICT, "TRIP_CANCELLED"),
            AppError::ConflictError(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            AppError::InternalServerError(_) | AppError::Anyhow(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {:#}", err);
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "message": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => AppError::ValidationError(msg),
            CoreError::Capacity { .. } => AppError::CapacityError(err.to_string()),
            CoreError::Authorization(msg) => AppError::AuthorizationError(msg),
            CoreError::Authentication(msg) => AppError::AuthenticationError(msg),
            CoreError::NotFound(_) => AppError::NotFoundError(err.to_string()),
            CoreError::AlreadyCancelled => AppError::AlreadyCancelled,
            CoreError::TripCancelled => AppError::TripCancelled,
            CoreError::Conflict(msg) => AppError::ConflictError(msg),
            CoreError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_capacity_maps_to_conflict() {
        let err = AppError::from(CoreError::Capacity {
            requested: 2,
            available: 1,
        });
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CAPACITY");
        assert_eq!(body["message"], "Only 1 seats available, requested 2");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let err = AppError::from(CoreError::Internal("connection refused".to_string()));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL");
        assert_eq!(body["message"], "Internal Server Error");
    }

    #[tokio::test]
    async fn test_not_found_message() {
        let (status, body) = body_json(CoreError::not_found("Trip").into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Trip not found");
    }
}
