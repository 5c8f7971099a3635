use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use shopscribe_ai::GenerateError;
use thiserror::Error;

use crate::spreadsheet::SpreadsheetError;

#[derive(Debug, Error)]
pub enum HandleError {
    // ── Configuration ──
    #[error("ANTHROPIC_API_KEY is not set. Add it to your .env file and restart the server.")]
    MissingCredential,

    // ── Client input ──
    #[error("No product names provided")]
    EmptyInput,

    #[error("No file uploaded")]
    NoFile,

    #[error("Please upload an Excel file (.xlsx)")]
    UnsupportedFile,

    #[error("Invalid request body: {0}")]
    BadRequest(#[from] JsonRejection),

    #[error("Invalid upload: {0}")]
    BadUpload(#[from] MultipartRejection),

    #[error("upload failed: {0}")]
    Multipart(#[from] MultipartError),

    // ── Remote ──
    #[error("Invalid API key. Check your ANTHROPIC_API_KEY in the .env file.")]
    Auth,

    #[error("Anthropic API error: {0}")]
    Remote(String),

    /// The model's answer was not a JSON array of handles.
    #[error("Failed to parse AI response")]
    ResponseFormat { raw: String },

    // ── Everything else ──
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] SpreadsheetError),

    #[error("Server error: {0}")]
    Other(String),
}

impl HandleError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::EmptyInput
            | Self::NoFile
            | Self::UnsupportedFile
            | Self::BadRequest(_)
            | Self::BadUpload(_)
            | Self::Multipart(_) => StatusCode::BAD_REQUEST,
            Self::Spreadsheet(SpreadsheetError::Read(_) | SpreadsheetError::NoSheets) => {
                StatusCode::BAD_REQUEST
            }
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::Remote(_) => StatusCode::BAD_GATEWAY,
            Self::MissingCredential
            | Self::ResponseFormat { .. }
            | Self::Spreadsheet(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GenerateError> for HandleError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::Auth(_) => Self::Auth,
            GenerateError::Api { .. } => Self::Remote(err.to_string()),
            GenerateError::Http(_) | GenerateError::Malformed(_) => Self::Other(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<String>,
}

impl IntoResponse for HandleError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: self.to_string(),
            raw: match self {
                Self::ResponseFormat { raw } => Some(raw),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}
