use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::NotesError;

impl NotesError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            NotesError::Io { .. } | NotesError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            NotesError::NotFound => StatusCode::NOT_FOUND,
            NotesError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for NotesError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}
