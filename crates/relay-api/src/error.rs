use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use relay_runtime::SessionError;
use serde_json::json;
use thiserror::Error;

const GENERIC_ERROR: &str = "An unknown error occurred.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("You need to sign in to continue.")]
    Unauthorized,

    #[error("Session error: {0}")]
    Session(SessionError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        if err.is_client_error() {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::Session(err)
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Session(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(_) | ApiError::Unauthorized => self.to_string(),
            ApiError::Session(ref e) => {
                tracing::error!("Session error: {}", e);
                GENERIC_ERROR.to_string()
            }
            ApiError::Internal(ref e) => {
                tracing::error!("Internal error: {:#}", e);
                GENERIC_ERROR.to_string()
            }
        };

        match serde_json::to_vec(&json!({ "error": message })) {
            Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
            Err(_) => (status, message).into_response(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
