use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, warn};
use thiserror::Error;

use crate::fetch::{ErrorBody, FetchError};
use crate::services::ServiceError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("{0}")]
    BadRequest(String),
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        ApiError::Service(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(err) => match err {
                ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                ServiceError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ServiceError::Fetch(fetch) => match fetch {
                    FetchError::NoCredentials { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                    FetchError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
                    FetchError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
                    FetchError::Exhausted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                },
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Upstream { status, .. } => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                ServiceError::Model { .. } | ServiceError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::Service(ServiceError::Fetch(err)) => err.to_body(),
            ApiError::Service(err) => ErrorBody::new(err.to_string(), err.details()),
            ApiError::BadRequest(message) => ErrorBody::new(message.clone(), None),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();
        if status.is_server_error() {
            error!("Request failed with {status}: {}", body.error);
        } else {
            warn!("Request rejected with {status}: {}", body.error);
        }
        (status, Json(body)).into_response()
    }
}
