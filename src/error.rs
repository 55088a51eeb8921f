use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// Failure value returned by the native backend. The payload is kept
    /// verbatim; `Display` applies the uniform normalization below.
    #[error("{}", normalize_failure(.0))]
    Backend(Value),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Please enter a connection name.")]
    EmptyProfileName,

    #[error("Another connection attempt is already in progress.")]
    Busy,

    #[error("Invalid stream locator: {0}")]
    InvalidLocator(String),

    #[error("Stream path is not valid UTF-8.")]
    InvalidStreamPath,
}

impl SessionError {
    /// Wrap a plain backend error message.
    pub fn backend_message(message: impl Into<String>) -> Self {
        SessionError::Backend(Value::String(message.into()))
    }
}

/// Normalize an arbitrary backend failure value into a human-readable
/// string: a bare string is used directly, an object with a string
/// `message` yields that message, anything else is serialized verbatim.
pub fn normalize_failure(value: &Value) -> String {
    if let Value::String(text) = value {
        return text.clone();
    }
    if let Some(message) = value.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    value.to_string()
}
