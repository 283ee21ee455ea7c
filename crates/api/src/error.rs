//! HTTP error mapping

use crate::service::PredictionError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Error returned by handlers.
///
/// Client errors carry their message to the caller. Internal errors are
/// logged with full detail and answered with a fixed context message.
#[derive(Debug)]
pub enum ApiError {
    BadRequest {
        message: String,
        field: Option<&'static str>,
    },
    Internal {
        context: &'static str,
        detail: String,
    },
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            field: None,
        }
    }

    pub fn internal(context: &'static str, detail: impl std::fmt::Display) -> Self {
        ApiError::Internal {
            context,
            detail: detail.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PredictionError> for ApiError {
    fn from(e: PredictionError) -> Self {
        match e {
            PredictionError::Validation(v) => ApiError::BadRequest {
                message: v.to_string(),
                field: Some(v.field()),
            },
            other => ApiError::internal("internal processing error", other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::BadRequest { message, field } => ErrorBody {
                error: message,
                field: *field,
            },
            ApiError::Internal { context, detail } => {
                error!("{}: {}", context, detail);
                ErrorBody {
                    error: context,
                    field: None,
                }
            }
        };
        (status, Json(body)).into_response()
    }
}
