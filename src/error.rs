use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::event::{EventError, IngestError};
use crate::repo::RepoError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Missing or unrecognized token.")] Unauthorized,
    #[error("not found")] NotFound,
    #[error("malformed event: {0}")] MalformedEvent(EventError),
    #[error("internal error")] Internal,
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound,
            RepoError::Internal(msg) => {
                tracing::error!("store error: {msg}");
                ApiError::Internal
            }
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Malformed(e) => ApiError::MalformedEvent(e),
            IngestError::Store(e) => e.into(),
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        // Malformed events answer 5xx so Slack redelivers.
        let status = match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MalformedEvent(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        HttpResponse::build(status).json(ApiErrorBody { message: self.to_string() })
    }
}
