//! Error types for the QueryMind service.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Every variant carries a stable machine-readable code and an HTTP status hint so the
//! boundary layer can render it without inspecting driver internals.

use axum::http::StatusCode;
use thiserror::Error;

/// Human-readable classification of a failed connection attempt.
///
/// Purely diagnostic: no retry or recovery decision is made from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    Refused,
    HostNotFound,
    AccessDenied,
    UnknownDatabase,
    Other,
}

/// MySQL server error numbers relevant to connect-time classification.
const ER_DBACCESS_DENIED_ERROR: u16 = 1044;
const ER_ACCESS_DENIED_ERROR: u16 = 1045;
const ER_BAD_DB_ERROR: u16 = 1049;

impl ConnectFailure {
    /// Classify a driver error raised while establishing a session.
    pub fn classify(err: &sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(io_err) => {
                if io_err.kind() == std::io::ErrorKind::ConnectionRefused {
                    return Self::Refused;
                }
                if is_lookup_failure(&io_err.to_string()) {
                    return Self::HostNotFound;
                }
                Self::Other
            }
            sqlx::Error::Database(db_err) => {
                if let Some(mysql_err) =
                    db_err.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                {
                    return match mysql_err.number() {
                        ER_ACCESS_DENIED_ERROR | ER_DBACCESS_DENIED_ERROR => Self::AccessDenied,
                        ER_BAD_DB_ERROR => Self::UnknownDatabase,
                        _ => Self::Other,
                    };
                }
                match db_err.code().as_deref() {
                    Some("28000") | Some("28P01") => Self::AccessDenied,
                    Some("3D000") => Self::UnknownDatabase,
                    _ => Self::Other,
                }
            }
            _ => Self::Other,
        }
    }

    /// Operator-facing description of the failure.
    pub fn describe(&self, native_message: &str) -> String {
        match self {
            Self::Refused => "Connection refused - Check if database server is running".to_string(),
            Self::HostNotFound => "Host not found - Check database host address".to_string(),
            Self::AccessDenied => "Access denied - Check username and password".to_string(),
            Self::UnknownDatabase => "Database does not exist".to_string(),
            Self::Other => format!("Database connection failed: {}", native_message),
        }
    }
}

fn is_lookup_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("failed to lookup address")
        || lower.contains("name or service not known")
        || lower.contains("nodename nor servname")
        || lower.contains("no such host")
        || lower.contains("temporary failure in name resolution")
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {message}")]
    Validation { message: String },

    #[error("Unsupported database type '{db_type}': {reason}")]
    UnsupportedType { db_type: String, reason: String },

    #[error("{message}")]
    Connection {
        cause: ConnectFailure,
        message: String,
    },

    #[error("Invalid connection ID: {connection_id}")]
    NotFound { connection_id: String },

    #[error("Query execution failed: {message}")]
    Query { message: String },

    #[error("Failed to fetch schema: {message}")]
    Schema { message: String },

    #[error("Permission denied: {operation} - {reason}")]
    Permission { operation: String, reason: String },

    #[error("Failed to {operation}: {message}")]
    Assistant { operation: String, message: String },

    #[error("Too many requests, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an unsupported backend error.
    pub fn unsupported_type(db_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedType {
            db_type: db_type.into(),
            reason: reason.into(),
        }
    }

    /// Create a classified connection error from a driver error.
    pub fn connection(err: &sqlx::Error) -> Self {
        let cause = ConnectFailure::classify(err);
        Self::Connection {
            cause,
            message: cause.describe(&err.to_string()),
        }
    }

    /// Create a connection error that did not originate from the driver.
    pub fn connection_other(message: impl Into<String>) -> Self {
        let cause = ConnectFailure::Other;
        Self::Connection {
            cause,
            message: cause.describe(&message.into()),
        }
    }

    /// Create a not found error for an unknown or disposed handle.
    pub fn not_found(connection_id: impl Into<String>) -> Self {
        Self::NotFound {
            connection_id: connection_id.into(),
        }
    }

    /// Create a query execution error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create a schema introspection error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create a permission error.
    pub fn permission(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Permission {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a language-model collaborator error.
    pub fn assistant(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Assistant {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable error code for client handling.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::UnsupportedType { .. } => "UNSUPPORTED_TYPE",
            Self::Connection { .. } => "CONNECTION_ERROR",
            Self::NotFound { .. } => "CONNECTION_NOT_FOUND",
            Self::Query { .. } => "QUERY_ERROR",
            Self::Schema { .. } => "SCHEMA_ERROR",
            Self::Permission { .. } => "PERMISSION_DENIED",
            Self::Assistant { .. } => "ASSISTANT_ERROR",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// HTTP status hint: caller mistakes and stale handles are 400, backend failures 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. }
            | Self::UnsupportedType { .. }
            | Self::NotFound { .. }
            | Self::Permission { .. } => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Connection { .. }
            | Self::Query { .. }
            | Self::Schema { .. }
            | Self::Assistant { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller, not the backend, is at fault.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Result type alias for service operations.
pub type AppResult<T> = Result<T, AppError>;
