//! Error types for oidclite
//!
//! Every failure the client can report is a variant of [`OidcError`], built
//! with `thiserror`. Callers that need to branch on the category of a failure
//! use [`OidcError::kind`] instead of matching on message text; the message is
//! a diagnostic only.

use std::fmt;

use thiserror::Error;

/// Failure categories reported by the client.
///
/// This is the stable, `Copy` counterpart of [`OidcError`]. It is what the
/// discovery status watch carries and what [`ErrorKind::name`] turns into the
/// failure name delivered through a result channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A resolved endpoint string is not a valid absolute URL.
    InvalidEndpointUrl,
    /// The authorization endpoint has not been resolved.
    MissingAuthorizationEndpoint,
    /// The token endpoint has not been resolved.
    MissingTokenEndpoint,
    /// The request never produced an HTTP response.
    TransportFailure,
    /// The provider answered with something other than `200 OK`.
    NonSuccessStatus,
    /// A `200 OK` token response body could not be decoded.
    ResponseDecodeFailure,
    /// The discovery document is not a JSON object.
    DiscoveryParseFailure,
    /// The `state` returned on the redirect does not match the issued one.
    StateMismatch,
    /// The provider redirected back with an `error` parameter.
    AuthorizationDenied,
    /// The redirect could not be interpreted.
    InvalidCallback,
    /// Invalid configuration.
    Config,
    /// Local IO failure.
    Io,
}

impl ErrorKind {
    /// Stable name for the failure category.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::InvalidEndpointUrl => "InvalidEndpointURL",
            ErrorKind::MissingAuthorizationEndpoint => "MissingAuthorizationEndpoint",
            ErrorKind::MissingTokenEndpoint => "MissingTokenEndpoint",
            ErrorKind::TransportFailure => "TransportFailure",
            ErrorKind::NonSuccessStatus => "NonSuccessStatus",
            ErrorKind::ResponseDecodeFailure => "ResponseDecodeFailure",
            ErrorKind::DiscoveryParseFailure => "DiscoveryParseFailure",
            ErrorKind::StateMismatch => "StateMismatch",
            ErrorKind::AuthorizationDenied => "AuthorizationDenied",
            ErrorKind::InvalidCallback => "InvalidCallback",
            ErrorKind::Config => "Config",
            ErrorKind::Io => "Io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Main error type for oidclite operations
#[derive(Error, Debug)]
pub enum OidcError {
    /// An endpoint URL from discovery or configuration failed to parse
    #[error("invalid endpoint URL '{url}': {source}")]
    InvalidEndpointUrl {
        /// The offending URL text
        url: String,
        /// Parser error
        #[source]
        source: url::ParseError,
    },

    /// No authorization endpoint has been resolved yet
    #[error("authorization endpoint has not been resolved")]
    MissingAuthorizationEndpoint,

    /// No token endpoint has been resolved yet
    #[error("token endpoint has not been resolved")]
    MissingTokenEndpoint,

    /// Connection, TLS, timeout or body read failure
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a status other than `200 OK`
    #[error("provider returned HTTP {status}: {description}")]
    NonSuccessStatus {
        /// Numeric HTTP status
        status: u16,
        /// Canonical reason phrase for the status
        description: String,
    },

    /// A `200 OK` token response that is not a JSON object
    #[error("unable to decode response: {reason}")]
    ResponseDecode {
        /// What went wrong while decoding
        reason: String,
    },

    /// A discovery response that is not a JSON object
    #[error("unable to parse discovery document: {reason}")]
    DiscoveryParse {
        /// What went wrong while parsing
        reason: String,
    },

    /// The redirect carried a `state` other than the one issued
    #[error("state mismatch in authorization callback")]
    StateMismatch,

    /// The provider reported an error on the redirect
    #[error("authorization denied by provider: {error}")]
    AuthorizationDenied {
        /// The `error` parameter (e.g. `access_denied`)
        error: String,
        /// The optional `error_description` parameter
        description: Option<String>,
    },

    /// The redirect URL could not be interpreted
    #[error("invalid authorization callback: {0}")]
    InvalidCallback(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl OidcError {
    /// Returns the failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OidcError::InvalidEndpointUrl { .. } => ErrorKind::InvalidEndpointUrl,
            OidcError::MissingAuthorizationEndpoint => ErrorKind::MissingAuthorizationEndpoint,
            OidcError::MissingTokenEndpoint => ErrorKind::MissingTokenEndpoint,
            OidcError::Transport(_) => ErrorKind::TransportFailure,
            OidcError::NonSuccessStatus { .. } => ErrorKind::NonSuccessStatus,
            OidcError::ResponseDecode { .. } => ErrorKind::ResponseDecodeFailure,
            OidcError::DiscoveryParse { .. } => ErrorKind::DiscoveryParseFailure,
            OidcError::StateMismatch => ErrorKind::StateMismatch,
            OidcError::AuthorizationDenied { .. } => ErrorKind::AuthorizationDenied,
            OidcError::InvalidCallback(_) => ErrorKind::InvalidCallback,
            OidcError::Config(_) | OidcError::Yaml(_) => ErrorKind::Config,
            OidcError::Io(_) => ErrorKind::Io,
        }
    }

    /// Builds an [`OidcError::InvalidEndpointUrl`] for `url`.
    pub(crate) fn invalid_endpoint(url: &str, source: url::ParseError) -> Self {
        OidcError::InvalidEndpointUrl {
            url: url.to_string(),
            source,
        }
    }
}

/// Result type alias for oidclite library operations
pub type Result<T> = std::result::Result<T, OidcError>;
