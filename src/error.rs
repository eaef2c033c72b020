use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::accounting::AccountingError;
use crate::model::ConversionError;

#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "{}", _0)]
    BadRequest(String),

    #[display(fmt = "Authentication required")]
    Unauthorized,

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "Database error: {}", _0)]
    Database(sqlx::Error),

    #[display(fmt = "Internal error: {}", _0)]
    Internal(anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "Internal Server Error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": message
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e)
    }
}

impl From<AccountingError> for AppError {
    fn from(e: AccountingError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

/// A stored row that fails validation is a data fault, not a client error.
impl From<ConversionError> for AppError {
    fn from(e: ConversionError) -> Self {
        AppError::Internal(anyhow::Error::new(e))
    }
}

/// Unique-key violation (MySQL 1062). SQLSTATE 23000 alone would also match
/// foreign-key failures, so the driver's error kind is used instead.
pub fn is_duplicate_key(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// The row points at a parent that does not exist (MySQL 1452).
pub fn is_missing_reference(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}


/// Stand-in for driver errors, which cannot be built outside sqlx.
#[cfg(test)]
pub(crate) mod fake_db {
    use std::borrow::Cow;
    use std::fmt;

    pub use sqlx::error::ErrorKind;
    use sqlx::error::DatabaseError;

    #[derive(Debug)]
    struct ConstraintFault {
        unique: bool,
    }

    impl fmt::Display for ConstraintFault {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message())
        }
    }

    impl std::error::Error for ConstraintFault {}

    impl DatabaseError for ConstraintFault {
        fn message(&self) -> &str {
            if self.unique {
                "Duplicate entry for key"
            } else {
                "Cannot add or update a child row: a foreign key constraint fails"
            }
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23000"))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            if self.unique {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::ForeignKeyViolation
            }
        }
    }

    /// Only unique and foreign-key kinds are modelled.
    pub fn constraint_error(kind: ErrorKind) -> sqlx::Error {
        let unique = matches!(kind, ErrorKind::UniqueViolation);
        sqlx::Error::Database(Box::new(ConstraintFault { unique }))
    }
}
