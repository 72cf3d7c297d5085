//! Redirect callback parameters.

use idlink_core::{LinkError, Result};
use serde::Deserialize;
use url::Url;

use super::AuthorizationRequest;

/// Query parameters the identity service appends to the redirect URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    /// Authorization code (the JWT-bearer assertion)
    #[serde(default)]
    pub code: Option<String>,
    /// State echoed back from the authorize request
    #[serde(default)]
    pub state: Option<String>,
    /// Error reported instead of a code
    #[serde(default)]
    pub error: Option<String>,
    /// Description of `error`
    #[serde(default)]
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse from a raw query string (without the leading `?`).
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "error_description" => params.error_description = value,
                _ => {}
            }
        }
        params
    }

    /// Parse from the full callback URL.
    pub fn from_url(url: &Url) -> Self {
        Self::from_query(url.query().unwrap_or_default())
    }

    /// Validate against the outstanding request and return the code.
    ///
    /// An `error` from the service wins over everything else; the state is
    /// checked before the code is looked at.
    pub fn into_code(self, request: &AuthorizationRequest) -> Result<String> {
        if let Some(error) = self.error.filter(|e| !e.is_empty()) {
            let message = match self.error_description {
                Some(description) if !description.is_empty() => {
                    format!("{}: {}", error, description)
                }
                _ => error,
            };
            return Err(LinkError::AuthorizationDenied(message));
        }

        if self.state.as_deref() != Some(request.state.as_str()) {
            return Err(LinkError::StateMismatch);
        }

        self.code
            .filter(|code| !code.is_empty())
            .ok_or_else(|| LinkError::config("callback is missing the authorization code"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::OAuthConfig;
    use idlink_core::ClientCredentials;

    fn request() -> AuthorizationRequest {
        let config = OAuthConfig::new(
            ClientCredentials::new("id", "secret"),
            "https://id.example.com/authorize",
            "https://id.example.com/token",
        );
        AuthorizationRequest::with_state(&config, "https://app.example.com/cb", "expected").unwrap()
    }

    #[test]
    fn test_from_url() {
        let url = Url::parse("https://app.example.com/cb?code=eyJ0eXAi&state=expected").unwrap();
        let params = CallbackParams::from_url(&url);
        assert_eq!(params.code.as_deref(), Some("eyJ0eXAi"));
        assert_eq!(params.into_code(&request()).unwrap(), "eyJ0eXAi");
    }

    #[test]
    fn test_error_wins() {
        let params = CallbackParams::from_query(
            "error=access_denied&error_description=User%20cancelled&state=wrong",
        );
        match params.into_code(&request()) {
            Err(LinkError::AuthorizationDenied(message)) => {
                assert_eq!(message, "access_denied: User cancelled")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_state_mismatch() {
        let params = CallbackParams::from_query("code=abc&state=forged");
        assert!(matches!(params.into_code(&request()), Err(LinkError::StateMismatch)));

        let params = CallbackParams::from_query("code=abc");
        assert!(matches!(params.into_code(&request()), Err(LinkError::StateMismatch)));
    }

    #[test]
    fn test_missing_code() {
        let params = CallbackParams::from_query("state=expected");
        assert!(params.into_code(&request()).unwrap_err().is_configuration());
    }
}
