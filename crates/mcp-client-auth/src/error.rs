//! Error types for discovery, validation, and request decoration
//!
//! Every fallible operation in this crate returns [`AuthResult`]. Errors carry
//! enough context (which endpoint, which field) for operator diagnosis, but
//! never the value of a token or client secret.
//!
//! ## Classification
//!
//! | Kind | Meaning | Discovery behaviour |
//! |------|---------|---------------------|
//! | [`ErrorKind::MalformedInput`] | unparseable, relative, or host-less URL | fatal |
//! | [`ErrorKind::SchemeViolation`] | non-HTTPS URL on a non-loopback host | fatal |
//! | [`ErrorKind::NetworkFailure`] | connect, timeout, or TLS failure | next candidate |
//! | [`ErrorKind::ProtocolViolation`] | bad status, content type, size, JSON, or field | next candidate |
//! | [`ErrorKind::SecurityPolicyViolation`] | PKCE, CIMD consistency, plaintext token | fatal |
//! | [`ErrorKind::Configuration`] | caller configuration is unusable | fatal |

use thiserror::Error;

/// Result type alias for this crate
pub type AuthResult<T> = Result<T, AuthError>;

/// Error classification for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unparseable, relative, or host-less URL
    MalformedInput,
    /// Plain HTTP used for a non-loopback host
    SchemeViolation,
    /// Connection, timeout, or TLS failure
    NetworkFailure,
    /// The remote party answered, but not with what the protocol requires
    ProtocolViolation,
    /// A security invariant does not hold
    SecurityPolicyViolation,
    /// Caller-supplied configuration is invalid
    Configuration,
}

/// Errors produced by the authorization engine
#[derive(Debug, Error)]
pub enum AuthError {
    /// A URL or other input could not be interpreted
    #[error("Malformed {what}: {reason}")]
    MalformedInput {
        /// What was being parsed (e.g. "issuer URL", "redirect_uris[0]")
        what: String,
        /// Why it was rejected
        reason: String,
    },

    /// A URL does not satisfy the HTTPS-except-loopback rule
    #[error("{what} must use https (http is only permitted for loopback hosts): {url}")]
    SchemeViolation {
        /// Which URL was checked
        what: String,
        /// The offending URL
        url: String,
    },

    /// The request never produced a response
    #[error("Request to {url} failed: {reason}")]
    Network {
        /// Endpoint that was contacted
        url: String,
        /// Underlying failure
        reason: String,
    },

    /// The response (or document) violates the expected protocol shape
    #[error("Protocol violation from {url}: {reason}")]
    Protocol {
        /// Endpoint or document source
        url: String,
        /// What was wrong
        reason: String,
    },

    /// A security policy check failed
    #[error("Security policy violation: {0}")]
    SecurityPolicy(String),

    /// Every discovery candidate failed
    #[error("No valid authorization server metadata found for {issuer}: {source}")]
    NoMetadataFound {
        /// Issuer that was being discovered
        issuer: String,
        /// The last error encountered
        #[source]
        source: Box<AuthError>,
    },

    /// No discovery candidate produced a response
    #[error("Authorization server metadata not found for {issuer}: no discovery endpoint responded")]
    MetadataNotFound {
        /// Issuer that was being discovered
        issuer: String,
    },

    /// Caller configuration is invalid
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl AuthError {
    /// Create a malformed-input error
    #[must_use]
    pub fn malformed(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Create a scheme-violation error
    #[must_use]
    pub fn scheme(what: impl Into<String>, url: impl Into<String>) -> Self {
        Self::SchemeViolation {
            what: what.into(),
            url: url.into(),
        }
    }

    /// Create a network-failure error
    #[must_use]
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a protocol-violation error
    #[must_use]
    pub fn protocol(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Protocol {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a security-policy error
    #[must_use]
    pub fn security(message: impl Into<String>) -> Self {
        Self::SecurityPolicy(message.into())
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Classify this error
    ///
    /// A [`AuthError::NoMetadataFound`] reports the kind of the error it wraps.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedInput { .. } => ErrorKind::MalformedInput,
            Self::SchemeViolation { .. } => ErrorKind::SchemeViolation,
            Self::Network { .. } | Self::MetadataNotFound { .. } => ErrorKind::NetworkFailure,
            Self::Protocol { .. } => ErrorKind::ProtocolViolation,
            Self::SecurityPolicy(_) => ErrorKind::SecurityPolicyViolation,
            Self::NoMetadataFound { source, .. } => source.kind(),
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Whether multi-candidate discovery may move on to the next candidate
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NetworkFailure | ErrorKind::ProtocolViolation
        )
    }
}
