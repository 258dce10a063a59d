use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error returned by every handler.
///
/// Client errors carry their message in the body. Validation failures list all
/// violated rules under `errors`; single-rule rejections put one message there.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("You cannot subscribe to yourself")]
    SelfSubscription,

    #[error("You are already subscribed to this author")]
    DuplicateSubscription,

    #[error("You are not subscribed to this author")]
    NotSubscribed,

    #[error("Recipe is already in {0}")]
    AlreadyInList(&'static str),

    #[error("Recipe is not in {0}")]
    NotInList(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::SelfSubscription
            | ApiError::DuplicateSubscription
            | ApiError::NotSubscribed
            | ApiError::AlreadyInList(_)
            | ApiError::NotInList(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation(messages) => json!({ "errors": messages }),
            ApiError::Internal(e) => {
                error!(error = ?e, "internal error");
                json!({ "detail": "Internal server error" })
            }
            e if status == StatusCode::BAD_REQUEST => json!({ "errors": e.to_string() }),
            e => json!({ "detail": e.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Returns true when the error is a Postgres unique-constraint violation.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Returns true when a referenced row is missing, e.g. deleted concurrently.
pub fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

/// Builds driver-level errors of a given kind for unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::{borrow::Cow, error::Error as StdError, fmt};

    use sqlx::error::{DatabaseError, ErrorKind};

    #[derive(Debug)]
    struct ConstraintError(ErrorKind);

    impl fmt::Display for ConstraintError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "constraint violated: {:?}", self.0)
        }
    }

    impl StdError for ConstraintError {}

    impl DatabaseError for ConstraintError {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            None
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.0 {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::ForeignKeyViolation => ErrorKind::ForeignKeyViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    pub fn db_error(kind: ErrorKind) -> sqlx::Error {
        sqlx::Error::Database(Box::new(ConstraintError(kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_lists_every_message() {
        let (status, body) = body_json(ApiError::Validation(vec![
            "first".into(),
            "second".into(),
        ]))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "errors": ["first", "second"] }));
    }

    #[tokio::test]
    async fn guard_errors_carry_single_message() {
        let (status, body) = body_json(ApiError::SelfSubscription).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"], "You cannot subscribe to yourself");

        let (status, body) = body_json(ApiError::AlreadyInList("favorites")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"], "Recipe is already in favorites");
    }

    #[tokio::test]
    async fn not_found_uses_detail() {
        let (status, body) = body_json(ApiError::NotFound("Recipe")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Recipe not found");
    }

    #[test]
    fn constraint_kinds_are_told_apart() {
        use sqlx::error::ErrorKind;

        let unique = testing::db_error(ErrorKind::UniqueViolation);
        assert!(is_unique_violation(&unique));
        assert!(!is_foreign_key_violation(&unique));

        let missing = testing::db_error(ErrorKind::ForeignKeyViolation);
        assert!(is_foreign_key_violation(&missing));
        assert!(!is_unique_violation(&missing));

        assert!(!is_foreign_key_violation(&sqlx::Error::RowNotFound));
    }

    #[tokio::test]
    async fn internal_hides_cause() {
        let (status, body) =
            body_json(ApiError::Internal(anyhow::anyhow!("connection refused"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");
    }
}
