use std::fmt;

use thiserror::Error;

/// Failure classification shared by every tool adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigurationMissing,
    ServiceUnreachable,
    AuthenticationFailed,
    EmptyResult,
    Unknown,
}

impl ErrorKind {
    /// Classify raw error text from a service client.
    ///
    /// The managed services do not surface structured error codes through
    /// every client path, so classification falls back to substring
    /// matching on the lower-cased message. Anything that is not
    /// recognizably an authentication problem classifies as `Unknown`.
    pub fn classify(message: &str) -> Self {
        let lowered = message.to_lowercase();
        if lowered.contains("authentication") || lowered.contains("credential") {
            Self::AuthenticationFailed
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing => "configuration_missing",
            Self::ServiceUnreachable => "service_unreachable",
            Self::AuthenticationFailed => "authentication_failed",
            Self::EmptyResult => "empty_result",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failure produced at tool registration time.
///
/// Invocation-time failures are carried inside [`NormalizedResult`]
/// instead; a `ToolError` only ever reaches the registry, which absorbs
/// it by omitting the tool.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ToolError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn configuration_missing(fields: &[&str]) -> Self {
        Self::new(
            ErrorKind::ConfigurationMissing,
            format!("missing required configuration: {}", fields.join(", ")),
        )
    }
}

/// The adapter-independent value returned to the orchestrating agent.
///
/// `Failure` is returned as data, never raised: the hosted agent has no
/// channel other than prose, so even an invocation failure must arrive as
/// a displayable message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NormalizedResult {
    Success { text: String },
    Failure { kind: ErrorKind, message: String },
}

impl NormalizedResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self::Success { text: text.into() }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure { kind, message: message.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The text the orchestrator relays, success or not.
    pub fn display_text(&self) -> &str {
        match self {
            Self::Success { text } => text,
            Self::Failure { message, .. } => message,
        }
    }
}

impl From<ToolError> for NormalizedResult {
    fn from(error: ToolError) -> Self {
        Self::Failure { kind: error.kind, message: error.message }
    }
}
