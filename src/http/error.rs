/*!
 * HTTP Errors
 * Maps store and query failures to status codes and `ErrorBody`
 */

use crate::core::errors::{ErrorBody, QueryError, StoreError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Error wrapper converting recorder errors into HTTP responses
#[derive(Debug)]
pub enum ApiError {
    Query(QueryError),
    Store(StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Query(QueryError::Store(inner)) | ApiError::Store(inner) => store_status(inner),
            ApiError::Query(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Query(e) => e.to_string(),
            ApiError::Store(e) => e.to_string(),
        }
    }
}

fn store_status(error: &StoreError) -> StatusCode {
    match error {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::NotResolvable(_) => StatusCode::CONFLICT,
        StoreError::DuplicateSequence(_) | StoreError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.message(), "Entries API request failed");
        }
        (status, Json(ErrorBody::new(self.message()))).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::Query(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
