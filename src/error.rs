//! Error types for wirecall operations.

use thiserror::Error;

/// Main error type for all wirecall operations.
#[derive(Debug, Error)]
pub enum WirecallError {
    /// Two operations would be published under the same name.
    ///
    /// Raised at registration time, before the table is modified. A
    /// duplicate is a defect in the handler definition itself, so
    /// construction or registration aborts instead of silently
    /// overwriting the earlier operation.
    #[error("operation {name:?} is already published")]
    DuplicateOperation {
        /// The contested operation name.
        name: String,
    },

    /// No operation is published under the requested name.
    ///
    /// The one failure a remote peer can trigger by itself. Dispatchers
    /// should translate it into a protocol-level "method not found"
    /// reply rather than tear the connection down.
    #[error("unknown operation {name:?}")]
    UnknownOperation {
        /// The name the caller asked for.
        name: String,
    },

    /// Parameter decoding or result encoding failed in a typed operation.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The connection behind a handle is gone.
    #[error("connection closed")]
    ConnectionClosed,

    /// An invoked operation failed in its own application logic.
    ///
    /// Passed through unchanged; encoding it into an error reply is the
    /// dispatcher's job.
    #[error("operation failed: {0}")]
    Operation(String),
}

impl WirecallError {
    /// Build an [`Operation`](WirecallError::Operation) error from any
    /// displayable message.
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }
}

/// Result type alias using [`WirecallError`].
pub type Result<T> = std::result::Result<T, WirecallError>;
