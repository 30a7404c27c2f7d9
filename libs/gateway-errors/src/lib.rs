//! Cross-cutting error taxonomy for the gateway.
//!
//! Every other crate in the workspace defines its own narrower error type
//! where it needs one, and converts into [`GatewayError`] via `#[from]` —
//! the same composition style `modkit_db::DbError` uses for `sqlx::Error`,
//! `url::ParseError`, and friends.

use thiserror::Error;

/// Library-wide result alias.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// The eight error kinds from the spec, plus `TxBusy` (Open Question
/// resolution: reject concurrent use of one transaction rather than queue).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Invalid or missing configuration. Fatal at startup.
    #[error("config error: {0}")]
    ConfigError(String),

    /// Open or ping failure. Surfaced to the caller of the triggering
    /// operation; never cached.
    #[error("connection error for database '{db_id}': {message}")]
    ConnectionError { db_id: String, message: String },

    /// All candidate catalog queries for a dialect strategy were exhausted.
    #[error("dialect strategy exhausted for '{operation}' on database '{db_id}': {message}")]
    DialectError {
        db_id: String,
        operation: String,
        message: String,
    },

    /// Error originating from a driver call inside a query, execute, or
    /// transaction, wrapped with operation context.
    #[error("driver error during {operation}: {message}")]
    DriverError { operation: String, message: String },

    /// Schema validation failure in the dispatcher.
    #[error("parameter error: {0}")]
    ParameterError(String),

    /// Transaction ID unknown or already terminated.
    #[error("transaction not found: {0}")]
    TxNotFound(String),

    /// The transaction is currently in use by another in-flight call.
    #[error("transaction busy: {0}")]
    TxBusy(String),

    /// Deadline expired.
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Malformed JSON-RPC input. Propagates as a protocol-level failure.
    #[error("framing error: {0}")]
    FramingError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    UrlParse(#[from] url::ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// Kind discriminant, independent of the message payload — used by the
    /// dispatcher to decide propagation policy (spec §7): `ConfigError` and
    /// `FramingError` are protocol-level; everything else folds into the
    /// content envelope.
    pub fn is_protocol_level(&self) -> bool {
        matches!(self, GatewayError::ConfigError(_) | GatewayError::FramingError(_))
    }

    /// Human-readable text suitable for a content-envelope `isError=true`
    /// payload (spec §4.7/§6). Driver/sqlx-sourced variants carry the raw
    /// driver message unchanged (spec §8: "SQL containing the placeholder
    /// style foreign to the dialect returns DriverError unchanged").
    pub fn to_envelope_text(&self) -> String {
        self.to_string()
    }

    pub fn timeout(d: std::time::Duration) -> Self {
        GatewayError::Timeout(d)
    }

    pub fn connection(db_id: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::ConnectionError {
            db_id: db_id.into(),
            message: message.into(),
        }
    }

    pub fn driver(operation: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::DriverError {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn dialect(
        db_id: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        GatewayError::DialectError {
            db_id: db_id.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_level_kinds() {
        assert!(GatewayError::ConfigError("bad".into()).is_protocol_level());
        assert!(GatewayError::FramingError("bad json".into()).is_protocol_level());
        assert!(!GatewayError::TxNotFound("abc".into()).is_protocol_level());
        assert!(!GatewayError::TxBusy("abc".into()).is_protocol_level());
    }

    #[test]
    fn envelope_text_is_human_readable() {
        let e = GatewayError::TxNotFound("tx-123".into());
        assert_eq!(e.to_envelope_text(), "transaction not found: tx-123");
    }
}
