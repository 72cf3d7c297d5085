//! Identity provider implementations for idlink.
//!
//! This crate turns an OAuth 2.0 callback into a canonical identity:
//!
//! - **VSTS** - Visual Studio Team Services (JWT-bearer assertion flow)
//!
//! ## Example
//!
//! ```rust,ignore
//! use idlink_providers::{ProviderRegistry, VstsIdentityProvider};
//! use idlink_core::ClientCredentials;
//! use std::sync::Arc;
//!
//! let registry = ProviderRegistry::new();
//! registry.register(Arc::new(VstsIdentityProvider::new(
//!     ClientCredentials::new("client-id", "client-secret"),
//! )));
//!
//! let provider = registry.require("vsts")?;
//! let request = provider.authorize("https://app.example.com/identity/callback")?;
//! // redirect the user to request.authorize_url
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod oauth;
mod provider;
mod registry;

#[cfg(feature = "vsts")]
mod vsts;

// Re-exports
pub use provider::*;
pub use registry::*;

#[cfg(feature = "vsts")]
pub use vsts::{VstsIdentityProvider, DEFAULT_SCOPES, VSTS_BASE_URL, VSTS_KEY};

/// Create a provider registry configured from environment variables.
///
/// Providers whose credentials are missing are skipped.
pub fn from_env() -> ProviderRegistry {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "vsts")]
    match VstsIdentityProvider::from_env() {
        Ok(provider) => registry.register(std::sync::Arc::new(provider)),
        Err(err) => tracing::debug!(error = %err, "VSTS provider not configured"),
    }

    registry
}

/// Prelude module for common imports.
pub mod prelude {
    pub use crate::oauth::{AuthorizationRequest, CallbackParams, OAuthConfig};
    pub use crate::provider::{BoxedProvider, IdentityProvider};
    pub use crate::registry::{global_registry, ProviderRegistry};
    #[cfg(feature = "vsts")]
    pub use crate::vsts::VstsIdentityProvider;
}
