//! Error types for the reasoning client.
//!
//! Uses `thiserror` for typed errors that surface through the whole
//! pipeline: template rendering, HTTP backends, response parsing.

/// Errors that can occur in the reasoning client.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to load or render a prompt template.
    #[error("template error: {0}")]
    Template(String),

    /// The backend returned an error or was unreachable.
    #[error("backend error: {0}")]
    Backend(String),

    /// The response could not be parsed into the expected structure.
    #[error("response parse error: {0}")]
    Parse(String),

    /// The call exceeded its deadline.
    #[error("timeout: reasoning call exceeded deadline")]
    Timeout,

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
