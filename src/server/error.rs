use crate::error::{Error, ErrorCode, ErrorType};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

/// The JSON body of every failed request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorBody {
    pub(crate) error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error_code: Option<ErrorCode>,
}

pub(crate) enum ApiError {
    /// The request itself is unusable, e.g. a required query parameter is missing.
    BadRequest(String),
    Failed(Error),
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self::Failed(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: message,
                    error_code: None,
                },
            ),
            Self::Failed(e) => {
                error!("Request failed: {e:?}");
                failure(&e)
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Sheet and configuration errors pass their message through. Local storage errors only show
/// the fixed message for their code.
fn failure(e: &Error) -> (StatusCode, ErrorBody) {
    let status = match e.error_type() {
        ErrorType::Request => StatusCode::BAD_REQUEST,
        ErrorType::Conflict => StatusCode::CONFLICT,
        ErrorType::Sheet | ErrorType::Config | ErrorType::Storage | ErrorType::Service => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let error = match (e.error_type(), e.code()) {
        (ErrorType::Storage, Some(code)) | (ErrorType::Conflict, Some(code)) => {
            code.user_message().to_string()
        }
        (ErrorType::Storage, None) => "Internal server error.".to_string(),
        _ => e.to_string(),
    };
    (
        status,
        ErrorBody {
            error,
            error_code: e.code(),
        },
    )
}

pub(crate) type ApiResponse<T> = Result<T, ApiError>;
