use crate::{backend::BackendError, services::gallery_service::GalleryError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::fmt;

/// A lightweight wrapper for errors that reach the HTTP edge. The message is
/// shown to the user verbatim.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    /// Extra structured context, e.g. per-file or per-field failures.
    pub details: Option<Value>,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.message,
            "status": self.status.as_u16()
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }

        (self.status, Json(body)).into_response()
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        let status = match &err {
            BackendError::Rejected(_) => StatusCode::UNAUTHORIZED,
            BackendError::NotFound { .. } | BackendError::BlobNotFound(_) => StatusCode::NOT_FOUND,
            BackendError::UnmappedUrl(_)
            | BackendError::InvalidPath(_)
            | BackendError::InvalidFieldName(_) => StatusCode::BAD_REQUEST,
            BackendError::InvalidField { .. }
            | BackendError::Serde(_)
            | BackendError::Sqlx(_)
            | BackendError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError::new(status, err.to_string())
    }
}

impl From<GalleryError> for AppError {
    fn from(err: GalleryError) -> Self {
        match err {
            GalleryError::NoFileSelected | GalleryError::MissingCredentials => {
                AppError::bad_request(err.to_string())
            }
            GalleryError::ConfirmationRequired => {
                AppError::new(StatusCode::PRECONDITION_REQUIRED, err.to_string())
            }
            GalleryError::ItemNotFound(_) => AppError::not_found(err.to_string()),
            GalleryError::UploadFailed {
                message,
                created,
                failed,
            } => AppError::new(StatusCode::BAD_GATEWAY, message)
                .with_details(json!({ "created": created, "failed": failed })),
            GalleryError::Backend(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gallery_errors_map_to_statuses() {
        let err: AppError = GalleryError::NoFileSelected.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Please select image(s) to upload.");

        let err: AppError = GalleryError::ConfirmationRequired.into();
        assert_eq!(err.status, StatusCode::PRECONDITION_REQUIRED);

        let err: AppError = GalleryError::Backend(BackendError::Rejected("nope".into())).into();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, "nope");
    }

    #[test]
    fn upload_failures_carry_details() {
        let err: AppError = GalleryError::UploadFailed {
            message: "quota exceeded".into(),
            created: vec!["a".into()],
            failed: vec![],
        }
        .into();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.details.unwrap()["created"], json!(["a"]));
    }
}
