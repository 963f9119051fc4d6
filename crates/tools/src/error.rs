use perch_core::ErrorKind;
use thiserror::Error;

/// Transport-layer failure from one of the managed service clients.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("credential source failed: {0}")]
    TokenSource(String),
}

impl BackendError {
    /// Bridge into the shared taxonomy.
    ///
    /// Classification is by message text, matching what the upstream
    /// services expose today (their auth errors spell out "credentials"
    /// in the response body). When the transports grow structured error
    /// codes this is the single place to switch on them instead.
    pub fn classify(&self) -> ErrorKind {
        ErrorKind::classify(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use perch_core::ErrorKind;

    use super::BackendError;

    #[test]
    fn auth_status_body_classifies_by_message_text() {
        let error = BackendError::Status {
            status: 401,
            body: "Request had invalid authentication credentials.".to_string(),
        };
        assert_eq!(error.classify(), ErrorKind::AuthenticationFailed);
    }

    #[test]
    fn token_source_failure_classifies_as_authentication() {
        let error = BackendError::TokenSource("no active application-default login".to_string());
        assert_eq!(error.classify(), ErrorKind::AuthenticationFailed);
    }

    #[test]
    fn decode_failure_classifies_as_unknown() {
        let error = BackendError::Decode("unexpected end of input".to_string());
        assert_eq!(error.classify(), ErrorKind::Unknown);
    }

    #[test]
    fn plain_server_error_classifies_as_unknown() {
        let error = BackendError::Status { status: 503, body: "upstream overloaded".to_string() };
        assert_eq!(error.classify(), ErrorKind::Unknown);
    }
}
