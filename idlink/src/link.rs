//! End-to-end linking functions.
//!
//! These functions drive one linking attempt from the authorize redirect to
//! the canonical identity. Use them when the provider trait's individual
//! steps are more than you need.
//!
//! # Examples
//!
//! ## Start an attempt
//!
//! ```rust,ignore
//! use idlink::link::begin_link;
//!
//! let request = begin_link("vsts", "/account/settings/identities/associate/vsts/")?;
//! // store `request` in the session, redirect to request.authorize_url
//! ```
//!
//! ## Finish it on the callback
//!
//! ```rust,ignore
//! use idlink::link::complete_link;
//! use idlink::CallbackParams;
//!
//! let params = CallbackParams::from_url(&callback_url);
//! let identity = complete_link("vsts", &request, params).await?;
//! println!("linked {} ({})", identity.name, identity.id);
//! ```

use std::sync::Arc;

use idlink_core::{AuthData, CanonicalIdentity, LinkError, LinkStage, Result};
use idlink_providers::oauth::{AuthorizationRequest, CallbackParams};
use idlink_providers::{global_registry, BoxedProvider, IdentityProvider};
use tracing::{debug, info, warn};

// ============================================================================
// Provider Specification
// ============================================================================

/// Provider specification - either a registry key like `"vsts"` or a provider instance.
///
/// Keys are looked up in the [`global_registry`].
#[derive(Clone)]
pub enum ProviderSpec {
    /// Provider specified by key or alias.
    Key(String),
    /// Pre-built provider instance.
    Instance(BoxedProvider),
}

impl From<&str> for ProviderSpec {
    fn from(s: &str) -> Self {
        ProviderSpec::Key(s.to_string())
    }
}

impl From<String> for ProviderSpec {
    fn from(s: String) -> Self {
        ProviderSpec::Key(s)
    }
}

impl From<BoxedProvider> for ProviderSpec {
    fn from(provider: BoxedProvider) -> Self {
        ProviderSpec::Instance(provider)
    }
}

impl ProviderSpec {
    /// Wrap any concrete provider type.
    pub fn from_provider<P: IdentityProvider + 'static>(provider: P) -> Self {
        ProviderSpec::Instance(Arc::new(provider))
    }

    fn resolve(self) -> Result<BoxedProvider> {
        match self {
            ProviderSpec::Key(key) => global_registry().require(&key),
            ProviderSpec::Instance(provider) => Ok(provider),
        }
    }
}

impl std::fmt::Debug for ProviderSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderSpec::Key(key) => f.debug_tuple("Key").field(key).finish(),
            ProviderSpec::Instance(provider) => f.debug_tuple("Instance").field(provider).finish(),
        }
    }
}

// ============================================================================
// Linking
// ============================================================================

/// Start a linking attempt.
///
/// Returns the state to keep until the callback arrives, including the URL
/// to send the user to.
pub fn begin_link(
    provider: impl Into<ProviderSpec>,
    redirect_url: &str,
) -> Result<AuthorizationRequest> {
    let provider = provider.into().resolve()?;
    let request = provider.authorize(redirect_url)?;
    debug!(
        provider = provider.key(),
        redirect_uri = %request.redirect_uri,
        "Link started"
    );
    Ok(request)
}

/// Finish a linking attempt from the callback parameters.
///
/// Validates the callback against `request`, exchanges the code and hands
/// the token to the provider's `build_identity`. Any failure ends the
/// attempt and no partial identity is returned.
pub async fn complete_link(
    provider: impl Into<ProviderSpec>,
    request: &AuthorizationRequest,
    params: CallbackParams,
) -> Result<CanonicalIdentity> {
    let provider = provider.into().resolve()?;
    let mut stage = LinkStage::default();

    let result = run_link(provider.as_ref(), request, params, &mut stage).await;
    match &result {
        Ok(identity) => info!(
            provider = provider.key(),
            id = %identity.id,
            scopes = ?identity.scopes,
            "Identity linked"
        ),
        Err(err) => warn!(
            provider = provider.key(),
            stage = %stage,
            error = %err,
            "Link failed"
        ),
    }
    result
}

async fn run_link(
    provider: &dyn IdentityProvider,
    request: &AuthorizationRequest,
    params: CallbackParams,
    stage: &mut LinkStage,
) -> Result<CanonicalIdentity> {
    let code = params.into_code(request)?;
    let redirect_url = request.redirect_uri.as_str();

    let token = provider.exchange_token(&code, redirect_url).await?;
    stage.advance();
    debug!(stage = %stage, "Token obtained");

    // Profile resolution happens inside build_identity.
    let identity = provider.build_identity(&token).await?;
    *stage = LinkStage::Linked;
    debug!(stage = %stage, "Identity built");
    Ok(identity)
}

/// Refresh the auth data stored with a linked identity.
///
/// An [`LinkError::IdentityNotValid`] means the user has to link again.
pub async fn refresh_link(
    provider: impl Into<ProviderSpec>,
    data: &AuthData,
    redirect_url: Option<&str>,
) -> Result<AuthData> {
    let provider = provider.into().resolve()?;
    provider.refresh_identity(data, redirect_url).await
}

/// Synchronous (blocking) [`complete_link`].
///
/// Creates a current-thread runtime per call. Cannot be used from async code.
pub fn complete_link_sync(
    provider: impl Into<ProviderSpec>,
    request: &AuthorizationRequest,
    params: CallbackParams,
) -> Result<CanonicalIdentity> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(LinkError::config(
            "complete_link_sync cannot be called from async context. Use complete_link instead.",
        ));
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| LinkError::config(format!("Failed to create runtime: {e}")))?;

    let provider = provider.into();
    rt.block_on(complete_link(provider, request, params))
}
