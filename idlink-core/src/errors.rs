//! Error types for idlink.
//!
//! Every failure is terminal for the linking attempt it happens in. The
//! variants say which leg of the flow failed so callers can tell a rejected
//! token exchange apart from an unreachable profile service.

use std::fmt;
use thiserror::Error;

/// The main error type for idlink operations.
#[derive(Error, Debug)]
pub enum LinkError {
    /// Missing or invalid configuration or call parameter.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The token endpoint rejected the exchange or returned an unusable body.
    #[error(transparent)]
    TokenExchange(#[from] TokenExchangeError),

    /// The profile or descriptor endpoint failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The stored identity can no longer be refreshed.
    #[error("Identity not valid: {0}")]
    IdentityNotValid(String),

    /// The identity service redirected back with an error instead of a code.
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    /// The callback `state` did not match the one issued with the authorize URL.
    #[error("Callback state mismatch")]
    StateMismatch,
}

/// Result type alias using LinkError.
pub type Result<T> = std::result::Result<T, LinkError>;

impl LinkError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an identity-not-valid error.
    pub fn identity_not_valid(msg: impl Into<String>) -> Self {
        Self::IdentityNotValid(msg.into())
    }

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this error came from the token endpoint.
    pub fn is_token_exchange(&self) -> bool {
        matches!(self, Self::TokenExchange(_))
    }

    /// Check if this error came from the profile or descriptor endpoint.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }

    /// Check if the stored identity must be re-linked from scratch.
    pub fn is_identity_not_valid(&self) -> bool {
        matches!(self, Self::IdentityNotValid(_))
    }
}

/// Failure talking to the token endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct TokenExchangeError {
    /// HTTP status code, if a response was received.
    pub status: Option<u16>,
    /// OAuth error code reported by the service (`error`).
    pub error_code: Option<String>,
    /// Human readable description (`error_description`).
    pub description: Option<String>,
    /// What went wrong locally.
    pub message: String,
}

impl fmt::Display for TokenExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token exchange failed")?;
        if let Some(status) = self.status {
            write!(f, " (status {})", status)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(ref code) = self.error_code {
            write!(f, " [{}]", code)?;
        }
        Ok(())
    }
}

impl TokenExchangeError {
    /// Create a new token exchange error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            error_code: None,
            description: None,
            message: message.into(),
        }
    }

    /// The request never produced a response.
    pub fn transport(err: impl fmt::Display) -> Self {
        Self::new(format!("request failed: {}", err))
    }

    /// The response body could not be parsed.
    pub fn malformed(err: impl fmt::Display) -> Self {
        Self::new(format!("malformed token response: {}", err))
    }

    /// Set the HTTP status.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the OAuth error code.
    #[must_use]
    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Set the error description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether the service has revoked the grant outright.
    ///
    /// A 401, or a 400 carrying `invalid_grant` (returned for suspended or
    /// removed users), means refreshing again will never succeed.
    pub fn invalidates_identity(&self) -> bool {
        match self.status {
            Some(401) => true,
            Some(400) => self.error_code.as_deref() == Some("invalid_grant"),
            _ => false,
        }
    }

    /// Format as `HTTP <status> (<error>): <description>`.
    pub fn summary(&self) -> String {
        format!(
            "HTTP {} ({}): {}",
            self.status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.error_code.as_deref().unwrap_or("unknown_error"),
            self.description
                .as_deref()
                .unwrap_or("no description available"),
        )
    }
}

/// The resource endpoints consulted after the token exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamEndpoint {
    /// `/_apis/profile/profiles/me`.
    Profile,
    /// `/_apis/connectionData/`, source of the subject descriptor.
    ConnectionData,
}

impl fmt::Display for UpstreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profile => write!(f, "profile"),
            Self::ConnectionData => write!(f, "connection data"),
        }
    }
}

/// Failure fetching the user's profile or descriptor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct UpstreamError {
    /// Which endpoint failed.
    pub endpoint: UpstreamEndpoint,
    /// HTTP status code, if a response was received.
    pub status: Option<u16>,
    /// Error message.
    pub message: String,
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Upstream {} error", self.endpoint)?;
        if let Some(status) = self.status {
            write!(f, " (status {})", status)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl UpstreamError {
    /// Create a new upstream error.
    pub fn new(endpoint: UpstreamEndpoint, message: impl Into<String>) -> Self {
        Self {
            endpoint,
            status: None,
            message: message.into(),
        }
    }

    /// Non-2xx response.
    pub fn status(endpoint: UpstreamEndpoint, status: u16, body: impl Into<String>) -> Self {
        Self {
            endpoint,
            status: Some(status),
            message: body.into(),
        }
    }

    /// The request never produced a response.
    pub fn transport(endpoint: UpstreamEndpoint, err: impl fmt::Display) -> Self {
        Self::new(endpoint, format!("request failed: {}", err))
    }

    /// The body did not have the expected shape.
    pub fn malformed(endpoint: UpstreamEndpoint, err: impl fmt::Display) -> Self {
        Self::new(endpoint, format!("malformed response: {}", err))
    }

    /// A required nested field was absent.
    pub fn missing_field(endpoint: UpstreamEndpoint, path: &str) -> Self {
        Self::new(endpoint, format!("missing field `{}`", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_exchange_display() {
        let err = TokenExchangeError::new("bad body")
            .with_status(400)
            .with_error_code("invalid_request");
        let s = err.to_string();
        assert!(s.contains("status 400"));
        assert!(s.contains("bad body"));
        assert!(s.contains("[invalid_request]"));
    }

    #[test]
    fn test_invalidates_identity() {
        assert!(TokenExchangeError::new("x").with_status(401).invalidates_identity());
        assert!(TokenExchangeError::new("x")
            .with_status(400)
            .with_error_code("invalid_grant")
            .invalidates_identity());
        assert!(!TokenExchangeError::new("x")
            .with_status(400)
            .with_error_code("invalid_request")
            .invalidates_identity());
        assert!(!TokenExchangeError::new("x").with_status(500).invalidates_identity());
        assert!(!TokenExchangeError::transport("refused").invalidates_identity());
    }

    #[test]
    fn test_summary_defaults() {
        let err = TokenExchangeError::new("x").with_status(503);
        assert_eq!(err.summary(), "HTTP 503 (unknown_error): no description available");

        let err = TokenExchangeError::new("x")
            .with_status(401)
            .with_error_code("invalid_client")
            .with_description("bad secret");
        assert_eq!(err.summary(), "HTTP 401 (invalid_client): bad secret");
    }

    #[test]
    fn test_upstream_display_names_endpoint() {
        let err = UpstreamError::status(UpstreamEndpoint::ConnectionData, 503, "down");
        assert_eq!(err.to_string(), "Upstream connection data error (status 503): down");

        let err = UpstreamError::missing_field(UpstreamEndpoint::Profile, "emailAddress");
        assert!(err.to_string().contains("`emailAddress`"));
    }

    #[test]
    fn test_link_error_from() {
        let err: LinkError = UpstreamError::new(UpstreamEndpoint::Profile, "boom").into();
        assert!(err.is_upstream());
        assert!(!err.is_token_exchange());

        let err: LinkError = TokenExchangeError::new("boom").into();
        assert!(err.is_token_exchange());

        assert!(LinkError::config("missing redirect").is_configuration());
        assert!(LinkError::identity_not_valid("revoked").is_identity_not_valid());
    }

    #[test]
    fn test_every_variant_names_a_leg() {
        let errors = [
            LinkError::config("x"),
            TokenExchangeError::new("x").into(),
            UpstreamError::new(UpstreamEndpoint::Profile, "x").into(),
            LinkError::identity_not_valid("x"),
            LinkError::AuthorizationDenied("x".into()),
            LinkError::StateMismatch,
        ];
        for err in errors {
            let leg = match err {
                LinkError::Configuration(_) => "configuration",
                LinkError::TokenExchange(_) => "token",
                LinkError::Upstream(_) => "upstream",
                LinkError::IdentityNotValid(_) => "refresh",
                LinkError::AuthorizationDenied(_) | LinkError::StateMismatch => "callback",
            };
            assert!(!leg.is_empty());
        }
    }
}
