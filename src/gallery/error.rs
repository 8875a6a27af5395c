use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid path")]
    InvalidPath,

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Not found")]
    NotFound,

    #[error("A file named {0} already exists")]
    AlreadyExists(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("File exceeds the {0} byte upload limit")]
    TooLarge(usize),

    #[error("Upload failed: {0}")]
    Upload(String),
}

impl GalleryError {
    fn status(&self) -> StatusCode {
        match self {
            GalleryError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GalleryError::InvalidPath
            | GalleryError::InvalidName(_)
            | GalleryError::UnsupportedType(_)
            | GalleryError::Upload(_) => StatusCode::BAD_REQUEST,
            GalleryError::NotFound => StatusCode::NOT_FOUND,
            GalleryError::AlreadyExists(_) => StatusCode::CONFLICT,
            GalleryError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for GalleryError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(json!({
                "success": false,
                "error": self.to_string(),
            })),
        )
            .into_response()
    }
}
