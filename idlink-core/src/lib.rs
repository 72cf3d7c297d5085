//! # idlink-core
//!
//! Core types, token parsing, and error handling for the idlink workspace.
//!
//! This crate provides the data model shared by every identity provider:
//!
//! - **Credentials**: OAuth client id and secret
//! - **Tokens**: token endpoint body parsing (form or JSON) and the stored auth blob
//! - **Profiles**: raw profile/connection records and the resolved user profile
//! - **Identities**: the canonical identity record produced by a linking attempt
//! - **Errors**: one error enum saying which leg of the flow failed
//!
//! ## Example
//!
//! ```rust
//! use idlink_core::token::{parse_token_body, TokenResponse};
//!
//! let payload = parse_token_body(
//!     Some("application/x-www-form-urlencoded"),
//!     b"access_token=abc&token_type=bearer",
//! )
//! .unwrap();
//! assert_eq!(payload["access_token"], "abc");
//!
//! let token = TokenResponse::from_payload(payload).unwrap();
//! assert_eq!(token.token_type.as_deref(), Some("bearer"));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod credentials;
pub mod errors;
pub mod identity;
pub mod profile;
pub mod stage;
pub mod token;

// Re-exports for convenience
pub use credentials::ClientCredentials;
pub use errors::{LinkError, Result, TokenExchangeError, UpstreamEndpoint, UpstreamError};
pub use identity::{normalize_scopes, CanonicalIdentity};
pub use profile::{ConnectionData, ProfileRecord, UserProfile};
pub use stage::LinkStage;
pub use token::{parse_token_body, AuthData, TokenPayload, TokenResponse};

/// Prelude module for common imports.
///
/// ```rust
/// use idlink_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::credentials::ClientCredentials;
    pub use crate::errors::{LinkError, Result, TokenExchangeError, UpstreamEndpoint, UpstreamError};
    pub use crate::identity::CanonicalIdentity;
    pub use crate::profile::UserProfile;
    pub use crate::stage::LinkStage;
    pub use crate::token::{AuthData, TokenResponse};
}
