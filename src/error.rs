//! Shared error handling utilities.
//!
//! Handlers respond with an [`ApiError`] envelope. Multi-step workflows run
//! inside diesel transactions whose error type is [`EngineError`], so a
//! failure in any sub-step rolls the whole unit back before it is mapped to
//! an HTTP response at the handler boundary.

use axum::{http::StatusCode, Json};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::DbPool;

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    #[schema(example = "Time slot conflicts with existing booking")]
    pub error: String,
    #[schema(example = "BOOKING_CONFLICT")]
    pub code: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }

    pub fn bad_request(
        error: impl Into<String>,
        code: impl Into<String>,
    ) -> (StatusCode, Json<Self>) {
        (StatusCode::BAD_REQUEST, Json(Self::new(error, code)))
    }

    pub fn not_found(
        error: impl Into<String>,
        code: impl Into<String>,
    ) -> (StatusCode, Json<Self>) {
        (StatusCode::NOT_FOUND, Json(Self::new(error, code)))
    }

    pub fn conflict(error: impl Into<String>, code: impl Into<String>) -> (StatusCode, Json<Self>) {
        (StatusCode::CONFLICT, Json(Self::new(error, code)))
    }

    pub fn internal(error: impl Into<String>, code: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Self::new(error, code)),
        )
    }

    pub fn db_error() -> (StatusCode, Json<Self>) {
        Self::internal("Database error", "DB_ERROR")
    }
}

pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

/// Classified failure of a booking/event engine operation.
///
/// Implements `From<diesel::result::Error>` so it can be used directly as
/// the error type of `Connection::transaction`, with `?` inside the closure
/// aborting (and rolling back) the transaction.
#[derive(Debug)]
pub enum EngineError {
    Validation(String, &'static str),
    Conflict(String, &'static str),
    Capacity(String, &'static str),
    NotFound(String, &'static str),
    Database(DieselError),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>, code: &'static str) -> Self {
        Self::Validation(msg.into(), code)
    }

    pub fn conflict(msg: impl Into<String>, code: &'static str) -> Self {
        Self::Conflict(msg.into(), code)
    }

    pub fn capacity(msg: impl Into<String>, code: &'static str) -> Self {
        Self::Capacity(msg.into(), code)
    }

    pub fn not_found(msg: impl Into<String>, code: &'static str) -> Self {
        Self::NotFound(msg.into(), code)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(..) => StatusCode::BAD_REQUEST,
            Self::Conflict(..) | Self::Capacity(..) => StatusCode::CONFLICT,
            Self::NotFound(..) => StatusCode::NOT_FOUND,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DieselError> for EngineError {
    fn from(e: DieselError) -> Self {
        Self::Database(e)
    }
}

impl From<EngineError> for (StatusCode, Json<ApiError>) {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Validation(msg, code) => ApiError::bad_request(msg, code),
            EngineError::Conflict(msg, code) => ApiError::conflict(msg, code),
            EngineError::Capacity(msg, code) => ApiError::conflict(msg, code),
            EngineError::NotFound(msg, code) => ApiError::not_found(msg, code),
            EngineError::Database(e) => classify_db_error(e),
        }
    }
}

/// Maps store-level failures onto the public taxonomy. Constraint
/// violations act as backstops for the in-transaction checks, so they keep
/// their 4xx classification instead of surfacing as server errors.
pub fn classify_db_error(e: DieselError) -> (StatusCode, Json<ApiError>) {
    match &e {
        DieselError::NotFound => ApiError::not_found("Resource not found", "NOT_FOUND"),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            error!(constraint = ?info.constraint_name(), "Unique constraint violation");
            ApiError::conflict("Resource already exists", "DUPLICATE")
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            error!(constraint = ?info.constraint_name(), "Foreign key violation");
            ApiError::bad_request("Referenced resource does not exist", "INVALID_REFERENCE")
        }
        DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
            error!(constraint = ?info.constraint_name(), "Check constraint violation");
            ApiError::conflict("Operation violates a data constraint", "CONSTRAINT_VIOLATION")
        }
        // Exclusion violations (SQLSTATE 23P01) reach diesel as `Unknown`,
        // so they are recognized by the server message instead of the kind.
        // The only exclusion constraint is the booking overlap backstop.
        DieselError::DatabaseError(DatabaseErrorKind::Unknown, info)
            if info.message().contains("exclusion constraint") =>
        {
            error!(constraint = ?info.constraint_name(), "Exclusion constraint violation");
            ApiError::conflict(
                "Time slot conflicts with existing booking",
                "BOOKING_CONFLICT",
            )
        }
        _ => {
            error!(error = %e, "Database error");
            ApiError::db_error()
        }
    }
}

pub fn get_db_conn(
    pool: &DbPool,
) -> Result<
    diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<diesel::PgConnection>>,
    (StatusCode, Json<ApiError>),
> {
    pool.get().map_err(|e| {
        error!(error = %e, "Database connection error");
        ApiError::internal("Database connection error", "DB_CONNECTION_ERROR")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_status_codes() {
        assert_eq!(
            EngineError::validation("bad", "BAD").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            EngineError::conflict("dup", "DUP").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            EngineError::capacity("full", "FULL").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            EngineError::not_found("gone", "GONE").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            EngineError::from(DieselError::RollbackTransaction).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_diesel_not_found_maps_to_404() {
        let (status, body): (StatusCode, Json<ApiError>) =
            EngineError::from(DieselError::NotFound).into();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "NOT_FOUND");
    }

    #[test]
    fn test_exclusion_violation_maps_to_conflict() {
        let e = DieselError::DatabaseError(
            DatabaseErrorKind::Unknown,
            Box::new(
                "conflicting key value violates exclusion constraint \"bookings_no_overlap\""
                    .to_string(),
            ),
        );
        let (status, body) = classify_db_error(e);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, "BOOKING_CONFLICT");
    }

    #[test]
    fn test_unknown_db_error_stays_internal() {
        let e = DieselError::DatabaseError(
            DatabaseErrorKind::Unknown,
            Box::new("out of memory".to_string()),
        );
        let (status, body) = classify_db_error(e);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "DB_ERROR");
    }

    #[test]
    fn test_api_error_envelope() {
        let err = ApiError::new("Event full", "EVENT_FULL");
        assert_eq!(err.error, "Event full");
        assert_eq!(err.code, "EVENT_FULL");
    }
}
