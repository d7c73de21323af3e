//! Error types for the session registry

use axum::http::StatusCode;
use thiserror::Error;

/// Which uniqueness rule or state rule a write ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Another session already uses this email
    EmailTaken,
    /// Generated session id collided with an existing one
    SessionIdTaken,
    /// Session is in a terminal state and can't be reactivated
    SessionTerminated,
}

impl ConflictKind {
    pub fn code(&self) -> &'static str {
        match self {
            ConflictKind::EmailTaken => "email_taken",
            ConflictKind::SessionIdTaken => "session_id_taken",
            ConflictKind::SessionTerminated => "session_terminated",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ConflictKind::EmailTaken => "Ya existe una sesión registrada con ese email",
            ConflictKind::SessionIdTaken => "El sessionId generado ya existe, intente de nuevo",
            ConflictKind::SessionTerminated => "La sesión ya fue finalizada",
        }
    }
}

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Blocking task failed to complete
    #[error("Task error: {0}")]
    Task(String),

    /// Storage backend failure other than a constraint violation
    #[error("Storage error: {0}")]
    Storage(String),

    /// Not found error
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uniqueness or state conflict
    #[error("Conflict: {}", .0.code())]
    Conflict(ConflictKind),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(..) => StatusCode::NOT_FOUND,
            CoreError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code, independent of the backend's wording
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation_failed",
            CoreError::NotFound(..) => "session_not_found",
            CoreError::Conflict(kind) => kind.code(),
            CoreError::Config(_) => "configuration_error",
            _ => "storage_failure",
        }
    }

    /// Message safe to hand back to a caller.
    ///
    /// Storage and internal failures get a fixed text; their detail only goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            CoreError::Validation(msg) => msg.clone(),
            CoreError::NotFound(..) => "No existe una sesión con ese sessionId".to_string(),
            CoreError::Conflict(kind) => kind.message().to_string(),
            _ => "Error interno al acceder al almacenamiento de sesiones".to_string(),
        }
    }
}
