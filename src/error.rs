use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The main error type for orgward.
///
/// Domain errors (`AuthError`, `OrganizationError`) convert into this type at
/// the edge so handlers can return a single error kind.
#[derive(Debug, thiserror::Error)]
pub enum OrgwardError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Bad, missing, expired or tampered credential, or insufficient permission.
    ///
    /// The message is for server logs only. Clients always see the same text.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Unique-constraint violation or a workflow precondition that conflicts
    /// with current state (duplicate membership, removing the owner).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure while beginning or committing a transaction.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Misconfiguration detected at startup. The process must not serve traffic.
    #[error("Fatal configuration error: {0}")]
    Fatal(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(String),
}

/// JSON body rendered for every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    error: String,
    error_id: String,
}

impl OrgwardError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn transaction_failed(msg: impl Into<String>) -> Self {
        Self::TransactionFailed(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::TransactionFailed(_)
            | Self::Fatal(_)
            | Self::Internal(_)
            | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
            #[cfg(feature = "database")]
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message suitable for clients.
    ///
    /// Server errors are replaced with generic text (CWE-209). Unauthorized
    /// never says why, so callers cannot tell an expired token from a forged
    /// one or from a token scoped to another organization.
    pub fn safe_message(&self) -> String {
        match self {
            Self::NotFound(msg) => format!("Not found: {}", msg),
            Self::BadRequest(msg) => format!("Bad request: {}", msg),
            Self::Conflict(msg) => format!("Conflict: {}", msg),
            Self::Unauthorized(_) => "Unauthorized".to_string(),

            Self::TransactionFailed(_)
            | Self::Fatal(_)
            | Self::Internal(_)
            | Self::Anyhow(_) => "Internal server error".to_string(),

            #[cfg(feature = "database")]
            Self::Database(_) => "Database error".to_string(),
        }
    }
}

impl IntoResponse for OrgwardError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        // Full detail stays in the server logs.
        if status.is_server_error() {
            tracing::error!(
                status = status.as_u16(),
                error_id = %error_id,
                error = %self,
                "Request failed"
            );
        } else {
            tracing::debug!(
                status = status.as_u16(),
                error_id = %error_id,
                error = %self,
                "Request rejected"
            );
        }

        let body = Json(ErrorResponse {
            error: self.safe_message(),
            error_id,
        });

        (status, body).into_response()
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OrgwardError>;

impl From<serde_json::Error> for OrgwardError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            OrgwardError::BadRequest(format!("JSON error: {}", err))
        } else {
            OrgwardError::Internal(format!("JSON serialization error: {}", err))
        }
    }
}

/// Client-facing text for unique constraint violations.
#[cfg(feature = "database")]
pub(crate) const DUPLICATE_RECORD: &str = "duplicate record";

#[cfg(feature = "database")]
impl From<sea_orm::DbErr> for OrgwardError {
    fn from(err: sea_orm::DbErr) -> Self {
        // Constraint text names tables and columns; keep it in the logs.
        if let Some(sea_orm::SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            tracing::debug!(%detail, "unique constraint violated");
            return OrgwardError::conflict(DUPLICATE_RECORD);
        }

        match &err {
            sea_orm::DbErr::RecordNotFound(msg) => OrgwardError::NotFound(if msg.is_empty() {
                "Record not found".to_string()
            } else {
                msg.clone()
            }),
            sea_orm::DbErr::Conn(inner) => {
                OrgwardError::Database(format!("Connection error: {}", inner))
            }
            sea_orm::DbErr::Query(inner) => {
                OrgwardError::Database(format!("Query error: {}", inner))
            }
            sea_orm::DbErr::Exec(inner) => {
                OrgwardError::Database(format!("Execution error: {}", inner))
            }
            _ => OrgwardError::Database(format!("Database error: {}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(OrgwardError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(OrgwardError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(OrgwardError::unauthorized("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(OrgwardError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            OrgwardError::transaction_failed("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            OrgwardError::fatal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthorized_message_is_undifferentiated() {
        let expired = OrgwardError::unauthorized("token expired");
        let wrong_org = OrgwardError::unauthorized("token scoped to another organization");

        assert_eq!(expired.safe_message(), "Unauthorized");
        assert_eq!(expired.safe_message(), wrong_org.safe_message());
        // Server-side display keeps the cause.
        assert!(expired.to_string().contains("token expired"));
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = OrgwardError::transaction_failed("connection reset by peer");
        assert_eq!(err.safe_message(), "Internal server error");

        let err = OrgwardError::internal("secret path /etc/passwd");
        assert!(!err.safe_message().contains("/etc/passwd"));
    }

    #[test]
    fn test_client_errors_keep_message() {
        let err = OrgwardError::conflict("Cannot remove organization owner");
        assert_eq!(err.safe_message(), "Conflict: Cannot remove organization owner");
    }

    #[test]
    fn test_json_error_classification() {
        let err: OrgwardError = serde_json::from_str::<serde_json::Value>("{bad")
            .unwrap_err()
            .into();
        assert!(matches!(err, OrgwardError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = OrgwardError::unauthorized("bad signature").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["error"], "Unauthorized");
        assert!(json["error_id"].as_str().is_some_and(|id| !id.is_empty()));
        assert!(!String::from_utf8_lossy(&body).contains("bad signature"));
    }
}
