//! Authorization request state.

use idlink_core::{LinkError, Result};
use url::Url;

use super::OAuthConfig;

/// State for one outstanding authorization redirect.
///
/// Keep it (e.g. in the user's session) until the identity service redirects
/// back, then hand it to [`CallbackParams::into_code`](super::CallbackParams::into_code).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Random state parameter for CSRF protection
    pub state: String,
    /// Absolute redirect URI sent with the request
    pub redirect_uri: Url,
    /// Where to send the user
    pub authorize_url: String,
}

impl AuthorizationRequest {
    /// Create a request with a fresh random state.
    pub fn new(config: &OAuthConfig, redirect_url: &str) -> Result<Self> {
        let state = generate_state()?;
        Self::with_state(config, redirect_url, state)
    }

    /// Create a request with a caller-supplied state.
    pub fn with_state(
        config: &OAuthConfig,
        redirect_url: &str,
        state: impl Into<String>,
    ) -> Result<Self> {
        let state = state.into();
        let redirect_uri = config.absolute_redirect(redirect_url)?;
        let authorize_url = build_authorize_url(config, &state, &redirect_uri);
        Ok(Self {
            state,
            redirect_uri,
            authorize_url,
        })
    }
}

/// Generate 32 random bytes as a hex string.
fn generate_state() -> Result<String> {
    use std::fmt::Write;
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| LinkError::config(format!("failed to generate state: {}", e)))?;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    Ok(s)
}

fn build_authorize_url(config: &OAuthConfig, state: &str, redirect_uri: &Url) -> String {
    let params = [
        ("client_id", config.credentials.client_id().to_string()),
        ("response_type", "code".to_string()),
        ("scope", config.scope_param()),
        ("state", state.to_string()),
        ("redirect_uri", redirect_uri.to_string()),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if config.authorize_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", config.authorize_url, separator, query)
}
