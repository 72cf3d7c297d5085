//! # idlink - Link external OAuth2 identities to canonical identity records
//!
//! idlink runs the account-linking leg of a single sign-on integration: the
//! user authorizes your application at the identity service, the service
//! redirects back with a code, and idlink turns that code into a
//! [`CanonicalIdentity`] keyed by the service's stable user id.
//!
//! ## Quick Start
//!
//! ```ignore
//! use idlink::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = ProviderSpec::from_provider(VstsIdentityProvider::from_env()?);
//!     let request = begin_link(provider.clone(), "https://app.example.com/identity/callback")?;
//!     // ... redirect the user, receive the callback ...
//!     let params = CallbackParams::from_url(&callback_url);
//!     let identity = complete_link(provider, &request, params).await?;
//!     println!("{} <{}>", identity.name, identity.email);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description | Default |
//! |---------|-------------|--------|
//! | `vsts` | Visual Studio Team Services | ✅ |
//! | `full` | All providers | ❌ |
//!
//! ## Architecture
//!
//! - [`idlink_core`] - Data model, token parsing, and errors
//! - [`idlink_providers`] - Provider trait, OAuth flow, VSTS, and registry
//!
//! ## Refreshing
//!
//! The identity's `data` blob carries the refresh token. When a refresh is
//! rejected outright the error is [`LinkError::IdentityNotValid`] and the user
//! has to link again:
//!
//! ```ignore
//! match idlink::refresh_link("vsts", &identity.data, Some(REDIRECT)).await {
//!     Ok(data) => store(data),
//!     Err(err) if err.is_identity_not_valid() => unlink(identity),
//!     Err(err) => return Err(err.into()),
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// End-to-end Linking
// ============================================================================

/// End-to-end linking functions.
pub mod link;

// ============================================================================
// Crate Re-exports
// ============================================================================

/// Data model, token parsing, and errors.
pub use idlink_core as core;

/// Provider trait, OAuth flow, and provider implementations.
pub use idlink_providers as providers;

// ============================================================================
// Type Re-exports (Flat)
// ============================================================================

// Errors
pub use idlink_core::{LinkError, Result, TokenExchangeError, UpstreamEndpoint, UpstreamError};

// Data model
pub use idlink_core::{
    AuthData, CanonicalIdentity, ClientCredentials, LinkStage, TokenResponse, UserProfile,
};

// Providers
pub use idlink_providers::oauth::{AuthorizationRequest, CallbackParams, OAuthConfig};
pub use idlink_providers::{global_registry, BoxedProvider, IdentityProvider, ProviderRegistry};

#[cfg(feature = "vsts")]
#[cfg_attr(docsrs, doc(cfg(feature = "vsts")))]
pub use idlink_providers::VstsIdentityProvider;

// Linking
pub use link::{begin_link, complete_link, complete_link_sync, refresh_link, ProviderSpec};

/// Register every provider configured in the environment with the global registry.
///
/// Returns the keys now available, aliases included.
pub fn init_from_env() -> Vec<String> {
    let registry = global_registry();
    let configured = idlink_providers::from_env();
    for key in configured.list() {
        if let Some(provider) = configured.get(&key) {
            if provider.key() == key {
                registry.register(provider);
            }
        }
    }
    registry.list()
}

// ============================================================================
// Prelude
// ============================================================================

/// Prelude module for common imports.
///
/// ```rust
/// use idlink::prelude::*;
/// ```
pub mod prelude {
    pub use crate::link::{begin_link, complete_link, refresh_link, ProviderSpec};
    pub use idlink_core::prelude::*;
    pub use idlink_providers::prelude::*;
}
