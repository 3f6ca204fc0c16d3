use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keyhole_core::ServiceError;
use tracing::error;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Service errors lifted into HTTP statuses. Soft-deleted records answer
/// 410 so clients can tell a retired link from one that never existed.
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ServiceError::NotFound | ServiceError::InvalidShortCode(_) => StatusCode::NOT_FOUND,
            ServiceError::Gone => StatusCode::GONE,
            err => {
                error!(%err, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        status.into_response()
    }
}
