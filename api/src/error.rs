use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use zania_rag::RagError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Questions file is not proper")]
    QuestionsNotProper,

    #[error("Missing form field: {0}")]
    MissingPart(&'static str),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Request is not a readable multipart form: {0}")]
    MultipartRejection(#[from] MultipartRejection),

    #[error(transparent)]
    Rag(#[from] RagError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::QuestionsNotProper => StatusCode::BAD_REQUEST,
            ApiError::MissingPart(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Multipart(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MultipartRejection(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Rag(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            log::error!("ZANIA CHAT: {}", self);
            "Internal Server Error".to_string()
        } else {
            log::warn!("ZANIA CHAT rejected request: {}", self);
            self.to_string()
        };

        let body = Json(json!({
            "status": false,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
