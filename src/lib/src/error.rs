use std::fmt;
use std::path::PathBuf;

/// HTTP status line returned by the signing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub code: u16,
    pub reason: String,
}

impl StatusLine {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Status line for a transport that only exposes the numeric code
    pub fn from_code(code: u16) -> Self {
        Self::new(code, String::new())
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.code)
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} {}", self.code, self.reason)
        }
    }
}

/// The winsign error type.
#[derive(Debug, thiserror::Error)]
pub enum WSError {
    #[error("Internal error: [{0}]")]
    InternalError(String),

    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Signer replied {status}{}", empty_body_note(.empty_body))]
    RemoteSignError { status: StatusLine, empty_body: bool },

    #[error("Signed output rejected: {0}")]
    SignValidationError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Usage error: {0}")]
    UsageError(&'static str),

    #[error("Could not sign file {}: {source}", .path.display())]
    ArtifactError {
        path: PathBuf,
        #[source]
        source: Box<WSError>,
    },
}

impl WSError {
    /// Short machine-readable name of the failure class, used in audit events
    pub fn kind(&self) -> &'static str {
        match self {
            WSError::InternalError(_) => "internal",
            WSError::IOError(_) => "local_io",
            WSError::TransportError(_) => "transport",
            WSError::RemoteSignError { .. } => "remote_sign",
            WSError::SignValidationError(_) => "sign_validation",
            WSError::InvalidConfig(_) => "config",
            WSError::UsageError(_) => "usage",
            WSError::ArtifactError { source, .. } => source.kind(),
        }
    }

    /// Wrap a per-file failure so the caller knows which artifact broke the run
    pub fn for_artifact(self, path: impl Into<PathBuf>) -> Self {
        WSError::ArtifactError {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

fn empty_body_note(empty_body: &bool) -> &'static str {
    if *empty_body {
        " with an empty body"
    } else {
        ""
    }
}
