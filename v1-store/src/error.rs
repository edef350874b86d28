use std::fmt;

/// Errors raised while talking to the document store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The document does not exist at this path
    NotFound(String),

    /// The token was rejected (401/403)
    Unauthorized(String),

    /// Connection failure or an unexpected response status
    Transport {
        path: String,
        status: Option<u16>,
        message: String,
    },

    /// The document exists but is not the JSON we expected
    Decode { path: String, message: String },
}

impl StoreError {
    pub fn transport(path: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        StoreError::Transport {
            path: path.to_string(),
            status,
            message: message.into(),
        }
    }

    pub fn decode(path: &str, message: impl fmt::Display) -> Self {
        StoreError::Decode {
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(path) => write!(f, "Document not found: {}", path),
            StoreError::Unauthorized(path) => write!(f, "Not authorized to access {}", path),
            StoreError::Transport {
                path,
                status: Some(status),
                message,
            } => write!(f, "Request for {} failed ({}): {}", path, status, message),
            StoreError::Transport {
                path,
                status: None,
                message,
            } => write!(f, "Request for {} failed: {}", path, message),
            StoreError::Decode { path, message } => {
                write!(f, "Malformed document {}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors raised by the record operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Registration for an email that already has an account
    EmailTaken(String),

    /// Email does not look like local@domain.tld
    InvalidEmail(String),

    /// No request carries this tracking ID
    RequestNotFound(String),

    /// Could not generate a tracking ID that is not already in use
    TrackingIdExhausted,

    /// Underlying store failure
    Store(StoreError),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::EmailTaken(email) => write!(f, "Email already registered: {}", email),
            RecordError::InvalidEmail(email) => write!(f, "Invalid email address: {}", email),
            RecordError::RequestNotFound(id) => write!(f, "Request not found: {}", id),
            RecordError::TrackingIdExhausted => write!(f, "Could not allocate a free tracking ID"),
            RecordError::Store(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for RecordError {
    fn from(err: StoreError) -> Self {
        RecordError::Store(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type RecordResult<T> = Result<T, RecordError>;
