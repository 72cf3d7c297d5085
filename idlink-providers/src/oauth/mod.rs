//! OAuth utilities for JWT-bearer authorization flows.
//!
//! This module provides reusable components for the assertion-based OAuth 2.0
//! flow used by Visual Studio Team Services:
//!
//! - [`OAuthConfig`]: Configuration for an OAuth provider
//! - [`AuthorizationRequest`]: State and URL for an outstanding authorize redirect
//! - [`CallbackParams`]: What the service sends back to the redirect URL
//! - [`exchange_token`]: Exchanges an authorization code for tokens
//! - [`refresh_token`]: Refreshes an expired access token
//!
//! Note: This module does NOT handle token storage - that's the application's responsibility.

pub mod config;
mod callback;
mod context;
mod flow;

pub use callback::CallbackParams;
pub use config::OAuthConfig;
pub use context::AuthorizationRequest;
pub use flow::{
    exchange_token, refresh_token, TokenExchangeRequest, CLIENT_ASSERTION_TYPE, JWT_BEARER_GRANT,
    REFRESH_TOKEN_GRANT,
};
