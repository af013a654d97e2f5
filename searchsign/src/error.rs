use std::fmt;

use http::StatusCode;
use thiserror::Error;

/// The error type for building clients and sending requests.
#[derive(Error, Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
    context: Vec<String>,
    status: Option<StatusCode>,
}

/// The kind of error that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The endpoint or client configuration is unusable.
    ConfigInvalid,

    /// No usable credential could be resolved while building the client.
    CredentialResolution,

    /// The request could not be assembled from its parameters, it was never sent.
    RequestInvalid,

    /// The outbound request could not be signed, it was never sent.
    Signing,

    /// The request could not be delivered or its response could not be read.
    Transport,

    /// The search service answered with a non-success status.
    Upstream,

    /// Anything else, such as body serialization failures.
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            context: Vec::new(),
            status: None,
        }
    }

    /// Add a source error.
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach a line of context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attach the response status that caused this error.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message without context.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The response status, only set for [`ErrorKind::Upstream`].
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Whether retrying the same call may succeed.
    ///
    /// The client never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ErrorKind::Transport => self
                .source
                .as_ref()
                .and_then(|e| e.downcast_ref::<searchsign_core::Error>())
                .is_some_and(|e| e.is_retryable()),
            ErrorKind::Upstream => self.status.is_some_and(|s| s.is_server_error()),
            _ => false,
        }
    }
}

impl Error {
    /// Create a config invalid error.
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create a credential resolution error.
    pub fn credential_resolution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialResolution, message)
    }

    /// Create a request invalid error.
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create a signing error.
    pub fn signing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Signing, message)
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Create an upstream error for the given status.
    pub fn upstream(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream, message).with_status(status)
    }

    /// Create an unexpected error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(status) = self.status {
            write!(f, ", status: {status}")?;
        }
        for ctx in &self.context {
            write!(f, ", {ctx}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::CredentialResolution => write!(f, "credential resolution failed"),
            ErrorKind::RequestInvalid => write!(f, "request invalid"),
            ErrorKind::Signing => write!(f, "signing failed"),
            ErrorKind::Transport => write!(f, "transport failed"),
            ErrorKind::Upstream => write!(f, "upstream error"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}
