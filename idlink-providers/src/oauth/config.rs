//! OAuth configuration.

use idlink_core::{ClientCredentials, LinkError, Result};
use url::Url;

/// Configuration for a JWT-bearer OAuth provider.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Client id and secret (the secret is sent as the client assertion)
    pub credentials: ClientCredentials,
    /// Authorization endpoint URL
    pub authorize_url: String,
    /// Token endpoint URL, also used for refresh grants
    pub token_url: String,
    /// Requested scopes
    pub scopes: Vec<String>,
    /// Prefix relative redirect URLs are resolved against
    pub url_prefix: Option<Url>,
}

impl OAuthConfig {
    /// Create a new OAuth configuration.
    pub fn new(
        credentials: ClientCredentials,
        authorize_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            authorize_url: authorize_url.into(),
            token_url: token_url.into(),
            scopes: Vec::new(),
            url_prefix: None,
        }
    }

    /// Set OAuth scopes.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the prefix for relative redirect URLs.
    #[must_use]
    pub fn with_url_prefix(mut self, prefix: Url) -> Self {
        self.url_prefix = Some(prefix);
        self
    }

    /// Scopes as the space separated `scope` parameter.
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }

    /// Resolve a redirect URL to an absolute one.
    ///
    /// The identity service compares `redirect_uri` byte for byte with the
    /// registered one, so relative paths are joined onto the URL prefix.
    pub fn absolute_redirect(&self, redirect_url: &str) -> Result<Url> {
        let redirect_url = redirect_url.trim();
        if redirect_url.is_empty() {
            return Err(LinkError::config("redirect URL is empty"));
        }

        match Url::parse(redirect_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
            Ok(url) => Err(LinkError::config(format!(
                "redirect URL must be http(s), got scheme {:?}",
                url.scheme()
            ))),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let prefix = self.url_prefix.as_ref().ok_or_else(|| {
                    LinkError::config(format!(
                        "relative redirect URL {:?} needs a configured URL prefix",
                        redirect_url
                    ))
                })?;
                prefix.join(redirect_url).map_err(|e| {
                    LinkError::config(format!("invalid redirect URL {:?}: {}", redirect_url, e))
                })
            }
            Err(e) => Err(LinkError::config(format!(
                "invalid redirect URL {:?}: {}",
                redirect_url, e
            ))),
        }
    }
}
