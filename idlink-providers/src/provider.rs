//! Identity provider trait.
//!
//! An identity provider represents an external identity service with its
//! OAuth endpoints, client credentials, and profile lookup.

use async_trait::async_trait;
use idlink_core::{AuthData, CanonicalIdentity, Result, TokenResponse, UserProfile};
use std::sync::Arc;

use crate::oauth::AuthorizationRequest;

/// Identity provider trait - links an external account to a canonical identity.
///
/// Providers handle:
/// - Building the authorize redirect
/// - Exchanging codes and refresh tokens at the token endpoint
/// - Resolving the user's stable identity from the service's APIs
#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// Provider key (e.g., "vsts"), used as the identity's type tag.
    fn key(&self) -> &str;

    /// Human readable provider name.
    fn name(&self) -> &str;

    /// Scopes requested at authorization time.
    fn scopes(&self) -> &[String];

    /// Start a linking attempt: build the authorize URL with a fresh state.
    fn authorize(&self, redirect_url: &str) -> Result<AuthorizationRequest>;

    /// Exchange an authorization code for tokens.
    async fn exchange_token(&self, code: &str, redirect_url: &str) -> Result<TokenResponse>;

    /// Exchange a refresh token for new tokens.
    ///
    /// Fails with a configuration error, without touching the network, when
    /// `redirect_url` is `None`.
    async fn refresh_token(
        &self,
        refresh_token: &str,
        redirect_url: Option<&str>,
    ) -> Result<TokenResponse>;

    /// Fetch the profile of the user `access_token` belongs to.
    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile>;

    /// Scopes to record for `token`: the granted ones if reported, else the requested ones.
    fn granted_scopes(&self, token: &TokenResponse) -> Vec<String> {
        token
            .granted_scopes()
            .unwrap_or_else(|| self.scopes().to_vec())
    }

    /// Compose the canonical identity from an already resolved profile.
    fn identity_from_profile(&self, token: &TokenResponse, profile: UserProfile) -> CanonicalIdentity {
        CanonicalIdentity::from_profile(
            self.key(),
            profile,
            self.granted_scopes(token),
            AuthData::from(token),
        )
    }

    /// Resolve the user behind `token` into a canonical identity.
    async fn build_identity(&self, token: &TokenResponse) -> Result<CanonicalIdentity> {
        let profile = self.fetch_profile(&token.access_token).await?;
        Ok(self.identity_from_profile(token, profile))
    }

    /// Refresh the auth data stored with a linked identity.
    async fn refresh_identity(&self, data: &AuthData, redirect_url: Option<&str>) -> Result<AuthData>;

    /// Check if the provider is configured (has credentials).
    fn is_configured(&self) -> bool {
        true
    }

    /// Get alternate keys for this provider.
    fn aliases(&self) -> &[&str] {
        &[]
    }
}

/// Type alias for boxed providers.
pub type BoxedProvider = Arc<dyn IdentityProvider>;
