use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Everything a boundary operation can fail with, in the shape the admin
/// dashboard and registration form already understand: a status code plus a
/// `{"error": reason}` body with a reason the user can act on.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing required fields")]
    MissingFields,
    #[error("Please select exactly {expected} song(s), got {got}")]
    SongSelectionMismatch { expected: i64, got: usize },
    #[error("Invalid song count: {0}")]
    InvalidPackageSize(i64),
    #[error("Email or phone number already registered for this workshop")]
    DuplicateRegistration,
    #[error("Registration {0} not found")]
    NotFound(i64),
    #[error("Registration has dependent records and cannot be deleted")]
    DependentRecordsExist,
    #[error("{0}")]
    BadRequest(String),
    #[error("Database connection failed")]
    Storage(#[from] sqlx::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFields
            | ApiError::SongSelectionMismatch { .. }
            | ApiError::InvalidPackageSize(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateRegistration | ApiError::DependentRecordsExist => {
                StatusCode::CONFLICT
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Storage(err) = &self {
            // The Display impl already hides the driver detail from the caller.
            error!(error = ?err, "storage failure");
        }

        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Maps constraint violations onto their domain meaning before falling back
/// to the generic storage failure. The unique indexes on (email, workshop)
/// and (phone, workshop) make a raced double-submit land here.
pub fn translate_db_error(err: sqlx::Error) -> ApiError {
    use sqlx::error::ErrorKind;

    match &err {
        sqlx::Error::Database(db_err) => match db_err.kind() {
            ErrorKind::UniqueViolation => ApiError::DuplicateRegistration,
            ErrorKind::ForeignKeyViolation => ApiError::DependentRecordsExist,
            _ => ApiError::Storage(err),
        },
        _ => ApiError::Storage(err),
    }
}
