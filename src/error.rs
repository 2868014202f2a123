use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sqlx::error::DatabaseError;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    #[error("invalid paste")]
    NotFound,
    #[error("empty paste")]
    EmptyContent,
    #[error("title too long (max {max} characters)")]
    TitleTooLong { max: usize },
    #[error("missing delete key")]
    MissingDeleteKey,
    #[error("invalid paste or delete key")]
    WrongDeleteKey,
    #[error("paste id already taken")]
    Conflict,
    #[error("error reading multipart data")]
    Multipart {
        #[from]
        source: MultipartError,
    },
    #[error("database error")]
    Database { source: sqlx::Error },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::EmptyContent => StatusCode::BAD_REQUEST,
            ApiError::TitleTooLong { .. } => StatusCode::BAD_REQUEST,
            ApiError::MissingDeleteKey => StatusCode::BAD_REQUEST,
            ApiError::WrongDeleteKey => StatusCode::UNAUTHORIZED,
            ApiError::Multipart { .. } => StatusCode::BAD_REQUEST,
            ApiError::Conflict => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status_code.is_server_error() {
            error!("request failed: {self:?}");
        }

        (status_code, format!("{self}")).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            sqlx::Error::Database(ref err) if is_unique_violation(err.as_ref()) => {
                ApiError::Conflict
            }
            _ => ApiError::Database { source },
        }
    }
}

/// SQLite `SQLITE_CONSTRAINT_UNIQUE`/`SQLITE_CONSTRAINT_PRIMARYKEY` and
/// Postgres `unique_violation`.
fn is_unique_violation(err: &dyn DatabaseError) -> bool {
    matches!(err.code().as_deref(), Some("2067" | "1555" | "23505"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_is_not_found() {
        assert!(matches!(
            ApiError::from(sqlx::Error::RowNotFound),
            ApiError::NotFound
        ));
    }

    #[test]
    fn not_found_and_wrong_key_use_uniform_messages() {
        assert_eq!(ApiError::NotFound.to_string(), "invalid paste");
        assert_eq!(
            ApiError::WrongDeleteKey.to_string(),
            "invalid paste or delete key"
        );
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            ApiError::EmptyContent.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::WrongDeleteKey.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn internal_errors_hide_their_source() {
        let response = ApiError::Database {
            source: sqlx::Error::PoolTimedOut,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(
            ApiError::Conflict.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(matches!(
            ApiError::from(sqlx::Error::PoolTimedOut),
            ApiError::Database { .. }
        ));
    }
}
