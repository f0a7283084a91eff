//! Error types for the Pragma SDK.

use thiserror::Error;

/// Errors raised while authoring or running a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    ///
    /// Returned by handlers when the backing object is gone.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An internal SDK error occurred.
    #[error("SDK error: {0}")]
    Sdk(String),

    /// The requested resource type is not registered with the provider.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A resource type name was registered twice on the same provider.
    #[error("Resource '{resource}' already registered on provider '{provider}'")]
    DuplicateResource {
        /// Provider name.
        provider: String,
        /// Resource type name.
        resource: String,
    },

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred (schema output, manifest reads).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A typed dependency was read before the runtime injected it.
    #[error("Dependency '{0}' not resolved. The dependent resource may not be READY yet.")]
    DependencyNotResolved(String),

    /// A runtime-only helper was called outside a lifecycle handler.
    #[error("{0} must be called from within a provider lifecycle handler")]
    NoRuntimeContext(String),

    /// Operation timed out.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Operation failed due to current state (precondition not met).
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Lifecycle hook not implemented by the handler.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),
}

impl ProviderError {
    /// Get the error message as a string.
    ///
    /// Returns the inner message for string-carrying variants and a fixed
    /// description for the wrapped ones.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Sdk(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::DuplicateResource { resource, .. } => resource,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Io(_err) => "I/O error (see Debug output)",
            Self::DependencyNotResolved(id) => id,
            Self::NoRuntimeContext(msg) => msg,
            Self::DeadlineExceeded(msg) => msg,
            Self::FailedPrecondition(msg) => msg,
            Self::Unimplemented(msg) => msg,
        }
    }
}

/// Errors returned by [`PragmaClient`](crate::client::PragmaClient) and the blocking client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API answered with a non-success status code.
    #[error("HTTP {status} from {url}: {detail}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request URL.
        url: String,
        /// `detail` field of the error body, or the raw body.
        detail: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the expected model.
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured base URL is not a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// `require_auth` was set but no token could be resolved.
    #[error("Authentication required: no token found for context '{0}'")]
    AuthenticationRequired(String),

    /// The caller passed an invalid combination of arguments.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The bearer token is unusable.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Credentials or CLI configuration could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// HTTP status code for [`ClientError::Status`], `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the API reported the target as missing.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Errors while reading the credentials file or CLI configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// `config.yaml` is not valid YAML.
    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: serde_yaml::Error,
    },

    /// `Cargo.toml` is not valid TOML.
    #[error("invalid TOML in {path}: {source}")]
    Toml {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },
}
