// NeuroSuite - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Every error that reaches a caller is one of five user-facing kinds
// (validation, auth required, session, network, server) or an ambient
// configuration/storage failure. Display strings are what the user sees.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all NeuroSuite operations.
#[derive(Debug)]
pub enum NeuroSuiteError {
    /// Bad file type/size, missing file, or invalid form field.
    Validation(ValidationError),

    /// No usable access token; the caller should send the user to login.
    AuthRequired,

    /// Token refresh was rejected; the session has been (or must be) dropped.
    Session(SessionError),

    /// The request never reached the service.
    Network(NetworkError),

    /// The service answered with a non-2xx status or an unusable body.
    Server(ServerError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// Durable token storage failed.
    Storage(StorageError),
}

impl NeuroSuiteError {
    /// True when the right reaction is a redirect to the login flow rather
    /// than an error banner.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::AuthRequired | Self::Session(_) => true,
            Self::Server(e) => e.is_unauthorized(),
            _ => false,
        }
    }
}

impl fmt::Display for NeuroSuiteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "{e}"),
            Self::AuthRequired => write!(f, "Please login to use this feature"),
            Self::Session(e) => write!(f, "{e}"),
            Self::Network(e) => write!(f, "{e}"),
            Self::Server(e) => write!(f, "{e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Storage(e) => write!(f, "Storage error: {e}"),
        }
    }
}

impl std::error::Error for NeuroSuiteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(e) => Some(e),
            Self::AuthRequired => None,
            Self::Session(e) => Some(e),
            Self::Network(e) => Some(e),
            Self::Server(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Storage(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// Recoverable input problems: the user is re-prompted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No file was offered.
    NoFile,

    /// The file name does not end with an allowed extension.
    UnsupportedFormat {
        file_name: String,
        allowed: Vec<String>,
    },

    /// The file exceeds the screen's size cap.
    FileTooLarge {
        file_name: String,
        size: u64,
        max_size: u64,
    },

    /// `submit` was called before a file was selected.
    NothingSelected,

    /// A new file was offered while a submission is in flight.
    SubmissionInProgress,

    /// The selected file could not be read for upload.
    FileUnreadable { file_name: String, reason: String },

    /// An account form field is invalid.
    Form { field: &'static str, reason: String },

    /// The service could not read usable signal metadata from the file.
    InvalidRecording { file_name: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFile => write!(f, "No file selected"),
            Self::UnsupportedFormat { allowed, .. } => {
                let list = allowed.join(", ");
                if allowed.len() == 1 {
                    write!(f, "Invalid file format. Please upload a {list} file.")
                } else {
                    write!(f, "Invalid file format. Please upload {list} files.")
                }
            }
            Self::FileTooLarge { max_size, .. } => write!(
                f,
                "File size too large. Maximum size is {}MB",
                max_size / super::constants::BYTES_PER_MB
            ),
            Self::NothingSelected => write!(f, "Please upload a file first"),
            Self::SubmissionInProgress => {
                write!(f, "A file is already being analysed. Please wait.")
            }
            Self::FileUnreadable { file_name, reason } => {
                write!(f, "Error processing file '{file_name}': {reason}")
            }
            Self::Form { reason, .. } => write!(f, "{reason}"),
            Self::InvalidRecording { .. } => write!(f, "Invalid EEG file format"),
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for NeuroSuiteError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Session errors
// ---------------------------------------------------------------------------

/// Token refresh failures. These always end the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The current token pair carries no refresh token.
    NoRefreshToken,

    /// The refresh endpoint rejected the token or could not be reached.
    RefreshRejected { reason: String },

    /// The refresh response had no access token.
    MissingAccessToken,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Session expired. Please login again.")
    }
}

impl std::error::Error for SessionError {}

impl From<SessionError> for NeuroSuiteError {
    fn from(e: SessionError) -> Self {
        Self::Session(e)
    }
}

// ---------------------------------------------------------------------------
// Network errors
// ---------------------------------------------------------------------------

/// Transport-level failure (offline, DNS, TLS, connection reset).
#[derive(Debug)]
pub struct NetworkError {
    pub url: String,
    pub source: reqwest::Error,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unable to connect to the server. Please check your internet connection."
        )
    }
}

impl std::error::Error for NetworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl From<NetworkError> for NeuroSuiteError {
    fn from(e: NetworkError) -> Self {
        Self::Network(e)
    }
}

// ---------------------------------------------------------------------------
// Server errors
// ---------------------------------------------------------------------------

/// A response the client cannot use: non-2xx, or a 2xx with a bad body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    /// HTTP status code of the response.
    pub status: u16,

    /// Message presented to the user (joined `detail` or a fallback).
    pub message: String,
}

impl ServerError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// A 2xx whose body is missing required fields.
    pub fn invalid_response(status: u16) -> Self {
        Self::new(status, "Invalid response from server")
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ServerError {}

impl From<ServerError> for NeuroSuiteError {
    fn from(e: ServerError) -> Self {
        Self::Server(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range or malformed.
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::InvalidValue {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is invalid. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for NeuroSuiteError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

/// Errors writing or removing the durable token file.
#[derive(Debug)]
pub enum StorageError {
    /// Filesystem operation failed.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },

    /// The token record could not be serialised.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
            Self::Json { path, source } => {
                write!(f, "Cannot serialise tokens for '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

impl From<StorageError> for NeuroSuiteError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

/// Convenience type alias for NeuroSuite results.
pub type Result<T> = std::result::Result<T, NeuroSuiteError>;

// =============================================================================
// Unit tests
// =============================================================================
